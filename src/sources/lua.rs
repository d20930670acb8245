//! Lua-backed script source.

use super::{Resolution, ScriptLoader, ScriptSource, ScriptValue};
use crate::error::{ConfigError, Result};
use mlua::{Lua, Value};
use std::path::PathBuf;

/// Nested sequences deeper than this are reported as opaque tables.
const MAX_NESTING: usize = 8;

/// Loader that evaluates Lua config files.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_registry::sources::{LuaLoader, ScriptLoader};
/// use std::path::PathBuf;
///
/// let source = LuaLoader::new()
///     .load(&[PathBuf::from("config.lua"), PathBuf::from("overrides.lua")])
///     .expect("config should evaluate");
/// ```
#[derive(Debug, Default, Clone)]
pub struct LuaLoader;

impl LuaLoader {
    /// Create a new Lua loader.
    pub fn new() -> Self {
        Self
    }
}

impl ScriptLoader for LuaLoader {
    fn load(&self, files: &[PathBuf]) -> Result<Box<dyn ScriptSource>> {
        let lua = Lua::new();

        for file in files {
            let code = std::fs::read_to_string(file).map_err(|e| ConfigError::ScriptLoad {
                file: file.clone(),
                message: e.to_string(),
            })?;

            lua.load(code.as_str())
                .set_name(format!("@{}", file.display()))
                .exec()
                .map_err(|e| ConfigError::ScriptLoad {
                    file: file.clone(),
                    message: e.to_string(),
                })?;
        }

        let name = files
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Box::new(LuaSource { lua, name }))
    }
}

/// An evaluated Lua state answering dotted-path queries against its globals.
pub struct LuaSource {
    lua: Lua,
    name: String,
}

impl ScriptSource for LuaSource {
    fn resolve(&self, path: &str) -> Resolution {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or(path);

        let mut current = self
            .lua
            .globals()
            .get::<Value>(first)
            .unwrap_or(Value::Nil);
        if matches!(current, Value::Nil) {
            return Resolution::TopLevelUndefined;
        }

        for segment in segments {
            let next = match &current {
                Value::Table(table) => table.get::<Value>(segment).unwrap_or(Value::Nil),
                _ => Value::Nil,
            };
            if matches!(next, Value::Nil) {
                return Resolution::Undefined {
                    segment: segment.to_string(),
                };
            }
            current = next;
        }

        Resolution::Found(convert(&current, 0))
    }

    fn name(&self) -> String {
        format!("lua:{}", self.name)
    }
}

fn convert(value: &Value, depth: usize) -> ScriptValue {
    match value {
        Value::Boolean(b) => ScriptValue::Boolean(*b),
        Value::Integer(i) => ScriptValue::Integer(i64::from(*i)),
        Value::Number(n) => ScriptValue::Number(*n),
        Value::String(s) => ScriptValue::String(s.to_string_lossy().to_string()),
        Value::Table(_) if depth >= MAX_NESTING => ScriptValue::Other("table"),
        Value::Table(table) => ScriptValue::List(
            table
                .clone()
                .sequence_values::<Value>()
                .filter_map(|v| v.ok())
                .map(|v| convert(&v, depth + 1))
                .collect(),
        ),
        other => ScriptValue::Other(other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_resolve_scalars() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "config.lua",
            r#"
seven = 7
half = 0.5
str = "str"
flag = true
"#,
        );

        let source = LuaLoader::new().load(&[path]).unwrap();
        assert_eq!(
            source.resolve("seven"),
            Resolution::Found(ScriptValue::Integer(7))
        );
        assert_eq!(
            source.resolve("half"),
            Resolution::Found(ScriptValue::Number(0.5))
        );
        assert_eq!(
            source.resolve("str"),
            Resolution::Found(ScriptValue::String("str".to_string()))
        );
        assert_eq!(
            source.resolve("flag"),
            Resolution::Found(ScriptValue::Boolean(true))
        );
    }

    #[test]
    fn test_resolve_nested_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "config.lua",
            r#"
tree = { stree = { number = 4.5 } }
"#,
        );

        let source = LuaLoader::new().load(&[path]).unwrap();
        assert_eq!(
            source.resolve("tree.stree.number"),
            Resolution::Found(ScriptValue::Number(4.5))
        );
        assert_eq!(source.resolve("absent"), Resolution::TopLevelUndefined);
        assert_eq!(source.resolve("absent.child"), Resolution::TopLevelUndefined);
        assert_eq!(
            source.resolve("tree.missing.number"),
            Resolution::Undefined {
                segment: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_lists() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "config.lua",
            r#"
list = {1, 2, 3}
points = {{1.5, 2.5}, {3.5, 4.5}}
"#,
        );

        let source = LuaLoader::new().load(&[path]).unwrap();
        assert_eq!(
            source.resolve("list"),
            Resolution::Found(ScriptValue::List(vec![
                ScriptValue::Integer(1),
                ScriptValue::Integer(2),
                ScriptValue::Integer(3),
            ]))
        );
        match source.resolve("points") {
            Resolution::Found(ScriptValue::List(points)) => assert_eq!(points.len(), 2),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_later_file_extends_earlier() {
        let temp_dir = TempDir::new().unwrap();
        let base = write(&temp_dir, "base.lua", "base = 10\n");
        let derived = write(&temp_dir, "derived.lua", "derived = base * 2\n");

        let source = LuaLoader::new().load(&[base, derived]).unwrap();
        assert_eq!(
            source.resolve("derived"),
            Resolution::Found(ScriptValue::Integer(20))
        );
    }

    #[test]
    fn test_syntax_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "broken.lua", "seven = = 7\n");

        let err = LuaLoader::new().load(&[path.clone()]).err().unwrap();
        match err {
            ConfigError::ScriptLoad { file, .. } => assert_eq!(file, path),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = LuaLoader::new().load(&[PathBuf::from("/nonexistent/config.lua")]);
        assert!(result.is_err());
    }
}
