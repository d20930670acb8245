//! # hotswap-registry
//!
//! Typed, hot-reloadable configuration values backed by Lua config files.
//!
//! ## Overview
//!
//! Code anywhere in a program declares the keys it needs with a type and
//! gets back a [`Handle`](core::Handle). A [`ConfigSession`](core::ConfigSession)
//! evaluates the config files, pushes every key's value into its handle, and
//! keeps watching the files: when they change, every handle is refreshed in
//! place. Reads are lock-free via `arc-swap`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_registry::prelude::*;
//!
//! # fn example() -> hotswap_registry::error::Result<()> {
//! // config.lua:
//! //   seven = 7
//! //   window = { size = { 1280, 720 } }
//! let seven = declare::<i32>("seven");
//! let size = declare::<Vector2>("window.size");
//! let speed = declare_bounded::<f32>("speed", 0.0, 10.0);
//!
//! let session = ConfigSession::open(["config.lua"])?;
//! println!("seven = {}, size = {:?}, speed = {}", seven.get(), size.get(), speed.get());
//! # Ok(())
//! # }
//! ```
//!
//! ## Behaviour
//!
//! - Missing keys, values of the wrong kind, and values failing validation
//!   are logged and leave the handle at its previous value.
//! - A config file that fails to evaluate is logged and changes nothing.
//! - Keys declared after a session opened are picked up by the next pass,
//!   which the watcher runs promptly.
//!
//! ## Feature Flags
//!
//! - `metrics`: OpenTelemetry counters and histograms for reload passes.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod reload;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use crate::core::{declare, declare_bounded};

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConfigSession, ConfigValue, Handle, Kind, Registry, SessionBuilder, Vector2, Vector3,
        declare, declare_bounded,
    };
    pub use crate::error::{ConfigError, Result, ValidationError};
    pub use crate::reload::ReloadReport;
}
