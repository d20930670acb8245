//! Initial load of Lua config files through a session.

use hotswap_registry::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn open(registry: &Arc<Registry>, files: &[PathBuf]) -> ConfigSession {
    ConfigSession::builder()
        .with_files(files.iter().cloned())
        .with_registry(Arc::clone(registry))
        .open()
        .unwrap()
}

#[test]
fn test_scalars_and_lists() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "config.lua",
        r#"
seven = 7
str = "str"
list = { 1, 2, 3 }
half = 0.5
precise = 0.125
enabled = true
names = { "a", "b" }
"#,
    );

    let registry = Arc::new(Registry::new());
    let seven = registry.declare::<i32>("seven");
    let string = registry.declare::<String>("str");
    let list = registry.declare::<Vec<i32>>("list");
    let half = registry.declare::<f32>("half");
    let precise = registry.declare::<f64>("precise");
    let enabled = registry.declare::<bool>("enabled");
    let names = registry.declare::<Vec<String>>("names");

    let session = open(&registry, &[config]);

    assert_eq!(*seven.get(), 7);
    assert_eq!(*string.get(), "str");
    assert_eq!(*list.get(), vec![1, 2, 3]);
    assert_eq!(*half.get(), 0.5);
    assert_eq!(*precise.get(), 0.125);
    assert!(*enabled.get());
    assert_eq!(*names.get(), vec!["a".to_string(), "b".to_string()]);

    let report = session.last_report();
    assert_eq!(report.generation, 1);
    assert!(!report.load_failed);
    assert!(!registry.is_dirty());
}

#[test]
fn test_vectors_and_nested_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "config.lua",
        r#"
window = {
    size = { 1280, 720 },
    title = "demo",
}
camera = { position = { 0.0, 1.5, -3.0 } }
path = { { 0, 0 }, { 1, 1 }, { 2, 4 } }
"#,
    );

    let registry = Arc::new(Registry::new());
    let size = registry.declare::<Vector2>("window.size");
    let title = registry.declare::<String>("window.title");
    let position = registry.declare::<Vector3>("camera.position");
    let path = registry.declare::<Vec<Vector2>>("path");
    let missing = registry.declare::<i32>("window.missing");

    let session = open(&registry, &[config]);

    assert_eq!(*size.get(), [1280.0, 720.0]);
    assert_eq!(*title.get(), "demo");
    assert_eq!(*position.get(), [0.0, 1.5, -3.0]);
    assert_eq!(*path.get(), vec![[0.0, 0.0], [1.0, 1.0], [2.0, 4.0]]);
    assert_eq!(*missing.get(), 0);

    let report = session.last_report();
    assert_eq!(report.updated, 4);
    assert_eq!(report.missing, 1);
}

#[test]
fn test_wrong_kind_and_bounds_leave_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "config.lua",
        r#"
flag = 1
speed = 42.0
short = { 1 }
"#,
    );

    let registry = Arc::new(Registry::new());
    let flag = registry.declare::<bool>("flag");
    let speed = registry.declare_bounded::<f32>("speed", 0.0, 10.0);
    let short = registry.declare::<Vector2>("short");

    let session = open(&registry, &[config]);

    assert!(!*flag.get());
    assert_eq!(*speed.get(), 0.0);
    assert_eq!(*short.get(), [0.0, 0.0]);

    let report = session.last_report();
    assert_eq!(report.missing, 2);
    assert_eq!(report.rejected, 1);
}

#[test]
fn test_later_file_overrides_earlier() {
    let temp_dir = TempDir::new().unwrap();
    let defaults = write(
        &temp_dir,
        "default.lua",
        r#"
port = 8080
server = { host = "localhost" }
"#,
    );
    let overrides = write(
        &temp_dir,
        "local.lua",
        r#"
port = 9090
server.timeout = 30
"#,
    );

    let registry = Arc::new(Registry::new());
    let port = registry.declare::<i32>("port");
    let host = registry.declare::<String>("server.host");
    let timeout = registry.declare::<u32>("server.timeout");

    let session = open(&registry, &[defaults, overrides]);

    assert_eq!(*port.get(), 9090);
    assert_eq!(*host.get(), "localhost");
    assert_eq!(*timeout.get(), 30);
    assert_eq!(session.files().len(), 2);
}

#[test]
fn test_syntax_error_keeps_session_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "config.lua", "seven = = 7");

    let registry = Arc::new(Registry::new());
    let seven = registry.declare::<i32>("seven");

    let session = open(&registry, &[config]);

    let report = session.last_report();
    assert!(report.load_failed);
    assert_eq!(report.missing, 1);
    assert_eq!(*seven.get(), 0);
    assert!(session.is_running());
    assert!(!registry.is_dirty());
}

#[test]
fn test_missing_file_is_a_load_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("not_yet.lua");

    let registry = Arc::new(Registry::new());
    registry.declare::<i32>("seven");

    let session = open(&registry, &[config]);
    assert!(session.last_report().load_failed);
}

#[test]
fn test_reload_now_and_describe() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "config.lua", "seven = 7\nstr = \"str\"\n");

    let registry = Arc::new(Registry::new());
    registry.declare::<i32>("seven");

    let session = open(&registry, &[config]);
    let string = registry.declare::<String>("str");

    // The watcher may already have caught the new key; either way the
    // explicit pass is a later one.
    let report = session.reload_now().unwrap();
    assert!(report.generation >= 2);
    assert!(!registry.is_dirty());
    assert_eq!(*string.get(), "str");

    let described = registry.describe();
    assert_eq!(described.len(), 2);
    assert_eq!(described[0].key, "seven");
    assert_eq!(described[0].kind, Kind::Int);
    assert_eq!(described[1].key, "str");
    assert_eq!(described[1].kind, Kind::String);
}

#[test]
fn test_global_registry_session() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "config.lua",
        "basic_loading = { global_seven = 7 }\n",
    );

    let seven = declare::<i32>("basic_loading.global_seven");
    let again = declare::<i32>("basic_loading.global_seven");
    assert!(seven.ptr_eq(&again));

    let session = ConfigSession::open([config.clone()]).unwrap();
    assert_eq!(*seven.get(), 7);
    assert!(Arc::ptr_eq(session.registry(), &Registry::global()));

    session.close();
    assert_eq!(*again.get(), 7);
}

#[test]
fn test_numeric_coercion_follows_lua() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "config.lua",
        r#"
numstr = "7"
half = 7.5
f = 7.0
ratio = "0.25"
"#,
    );

    let registry = Arc::new(Registry::new());
    let numstr = registry.declare::<i32>("numstr");
    let half = registry.declare::<i32>("half");
    let f = registry.declare::<String>("f");
    let ratio = registry.declare::<f64>("ratio");

    let session = open(&registry, &[config]);

    assert_eq!(*numstr.get(), 7);
    assert_eq!(*half.get(), 7);
    assert_eq!(*f.get(), "7.0");
    assert_eq!(*ratio.get(), 0.25);
    assert_eq!(session.last_report().missing, 0);
}
