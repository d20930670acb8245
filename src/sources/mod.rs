//! Script source implementations.

mod lua;
mod script_source;

pub use lua::{LuaLoader, LuaSource};
pub use script_source::{Resolution, ScriptLoader, ScriptSource, ScriptValue};
