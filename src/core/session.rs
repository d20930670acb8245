//! Session lifecycle: initial load, watching, shutdown.

use crate::core::{Registry, SessionBuilder};
use crate::error::Result;
use crate::notify::{ConfigWatcher, SubscriptionHandle};
use crate::reload::{ReloadEngine, ReloadReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// A set of config files bound to a registry and kept in sync with it.
///
/// Opening a session runs one reload pass synchronously, so every key
/// declared before the open already holds its configured value when `open`
/// returns. A background watcher then reloads whenever the files change or
/// new keys are declared. Closing or dropping the session stops the watcher
/// and waits for it; handles keep their last values afterwards.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_registry::prelude::*;
///
/// # fn example() -> Result<()> {
/// let seven = declare::<i32>("seven");
/// let session = ConfigSession::open(["config.lua"])?;
///
/// println!("seven = {}", seven.get());
/// session.close();
/// # Ok(())
/// # }
/// ```
pub struct ConfigSession {
    engine: Arc<ReloadEngine>,
    watcher: ConfigWatcher,
}

impl ConfigSession {
    /// Open a session on the process-wide registry.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::open`].
    pub fn open<I, P>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        SessionBuilder::new().with_files(files).open()
    }

    /// Create a new builder for a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn new(engine: Arc<ReloadEngine>, watcher: ConfigWatcher) -> Self {
        Self { engine, watcher }
    }

    /// The backing files, in evaluation order.
    pub fn files(&self) -> &[PathBuf] {
        self.engine.files()
    }

    /// The registry this session refreshes.
    pub fn registry(&self) -> &Arc<Registry> {
        self.engine.registry()
    }

    /// Run a reload pass now, without waiting for a file change.
    ///
    /// # Errors
    ///
    /// See [`ReloadEngine::reload`].
    pub fn reload_now(&self) -> Result<ReloadReport> {
        self.engine.reload()
    }

    /// Report of the most recent pass.
    pub fn last_report(&self) -> ReloadReport {
        self.engine.last_report()
    }

    /// Receiver notified after every reload pass.
    pub fn reloads(&self) -> watch::Receiver<ReloadReport> {
        self.engine.reloads()
    }

    /// Register a callback run after every reload pass.
    ///
    /// Callbacks run on the watcher thread; drop the returned handle to
    /// unsubscribe. A callback may call [`reload_now`](Self::reload_now), but
    /// the nested pass notifies subscribers again, so guard against
    /// reloading unconditionally.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ReloadReport) + Send + Sync + 'static,
    {
        self.engine.subscribe(callback)
    }

    /// Block until every key declared so far has been through a reload pass.
    ///
    /// Returns `false` on timeout.
    pub fn wait_until_synced(&self, timeout: Duration) -> bool {
        self.engine.registry().wait_until_synced(timeout)
    }

    /// Whether the watcher thread is still running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// Stop watching and wait for the watcher thread to exit.
    pub fn close(mut self) {
        self.watcher.stop();
        info!("Config session closed");
    }
}

impl Drop for ConfigSession {
    fn drop(&mut self) {
        self.watcher.stop();
    }
}

impl std::fmt::Debug for ConfigSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSession")
            .field("files", &self.engine.files())
            .field("running", &self.watcher.is_running())
            .field("generation", &self.engine.last_report().generation)
            .finish()
    }
}
