//! OpenTelemetry metrics for reload passes.
//!
//! Tracks:
//! - Passes started, load failures and aborted passes
//! - Slots updated and rejected
//! - Pass duration
//! - Number of registered keys
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_registry::prelude::*;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let session = ConfigSession::builder()
//!     .with_file("config.lua")
//!     .with_metrics(meter)
//!     .open()?;
//! # Ok(())
//! # }
//! ```

mod reload_metrics;

pub use reload_metrics::ReloadMetrics;
