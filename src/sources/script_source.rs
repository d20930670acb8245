//! Script source traits and the value model they answer with.

use crate::error::Result;
use std::path::PathBuf;

/// A value read out of an evaluated script namespace.
///
/// Tables are flattened to their sequence part; named fields of a table are
/// only reachable by descending a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Boolean leaf
    Boolean(bool),
    /// Integer leaf
    Integer(i64),
    /// Floating point leaf
    Number(f64),
    /// String leaf
    String(String),
    /// Sequence of values (`{1, 2, 3}`)
    List(Vec<ScriptValue>),
    /// Anything else the engine can produce (functions, userdata, ...)
    Other(&'static str),
}

impl ScriptValue {
    /// Human-readable name of the runtime kind, used in mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "table",
            Self::Other(name) => name,
        }
    }
}

/// Outcome of resolving a dotted path against a script namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The path resolved to a value.
    Found(ScriptValue),
    /// The first segment of the path is not defined.
    ///
    /// Config files are allowed to define top-level names lazily, so this is
    /// not treated as an error.
    TopLevelUndefined,
    /// A nested segment of the path is not defined.
    Undefined {
        /// The segment that could not be resolved
        segment: String,
    },
}

/// An evaluated set of script files answering point queries by dotted path.
///
/// Sources live for a single reload pass and are never shared across threads.
pub trait ScriptSource {
    /// Resolve `path` (`"a.b.c"`) by repeated namespace descent.
    fn resolve(&self, path: &str) -> Resolution;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}

/// Evaluates an ordered list of files into a [`ScriptSource`].
///
/// Files are evaluated in order in one shared namespace, so later files can
/// reference and extend definitions from earlier ones.
pub trait ScriptLoader: Send + Sync {
    /// Evaluate `files` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ScriptLoad`](crate::error::ConfigError::ScriptLoad)
    /// naming the first file that failed to evaluate.
    fn load(&self, files: &[PathBuf]) -> Result<Box<dyn ScriptSource>>;
}
