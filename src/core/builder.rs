//! Builder for opening [`ConfigSession`]s.

use crate::core::{ConfigSession, Registry};
use crate::error::{ConfigError, Result};
use crate::notify::{ConfigWatcher, DEFAULT_POLL_INTERVAL};
use crate::reload::ReloadEngine;
use crate::sources::{LuaLoader, ScriptLoader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;
#[cfg(feature = "metrics")]
use opentelemetry::metrics::Meter;

/// Builder for a [`ConfigSession`].
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_registry::prelude::*;
/// use std::time::Duration;
///
/// # fn example() -> Result<()> {
/// let session = ConfigSession::builder()
///     .with_file("config/default.lua")
///     .with_file("config/local.lua")
///     .with_poll_interval(Duration::from_millis(100))
///     .open()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    files: Vec<PathBuf>,
    registry: Option<Arc<Registry>>,
    loader: Option<Arc<dyn ScriptLoader>>,
    poll_interval: Duration,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl SessionBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            registry: None,
            loader: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Add a config file.
    ///
    /// Files are evaluated in the order given, all into one environment, so
    /// a later file can override or extend what an earlier one defined.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add several config files, in order.
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Refresh `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Evaluate files with `loader` instead of Lua.
    pub fn with_loader<L: ScriptLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Bounded wait for file events. Files must stay unchanged for twice this
    /// long before a change is reloaded.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Record reload metrics with `meter`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: Meter) -> Self {
        self.metrics = Some(ReloadMetrics::new(meter));
        self
    }

    /// Run the initial load and start watching.
    ///
    /// A file that fails to evaluate does not fail the open: the error is
    /// logged, every slot keeps its value, and the watcher picks up the fix.
    ///
    /// # Errors
    ///
    /// Returns an error if no file was given, the poll interval is zero, or
    /// the watcher cannot be started.
    pub fn open(self) -> Result<ConfigSession> {
        if self.files.is_empty() {
            return Err(ConfigError::Other(
                "a config session needs at least one file".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Other(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let registry = self.registry.unwrap_or_else(Registry::global);
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(LuaLoader::new()) as Arc<dyn ScriptLoader>);

        let engine = ReloadEngine::new(registry, loader, self.files);
        #[cfg(feature = "metrics")]
        let engine = match self.metrics {
            Some(metrics) => engine.with_metrics(metrics),
            None => engine,
        };
        let engine = Arc::new(engine);

        let watcher = ConfigWatcher::start(Arc::clone(&engine), self.poll_interval)?;
        info!(
            files = engine.files().len(),
            keys = engine.registry().len(),
            "Config session opened"
        );

        Ok(ConfigSession::new(engine, watcher))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
