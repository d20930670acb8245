//! Reload passes: evaluate the backing files and refresh every slot.

mod engine;
mod fetch;

pub use engine::{ReloadEngine, ReloadReport};
pub(crate) use fetch::fetch;
