//! Full refresh passes over every registered slot.

use crate::core::{Kind, Registry, SlotOutcome};
use crate::error::{ConfigError, Result};
use crate::notify::{SubscriberRegistry, SubscriptionHandle};
use crate::sources::ScriptLoader;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Summary of one reload pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReloadReport {
    /// Pass number; the initial load is 1, 0 means no pass has run yet
    pub generation: u64,
    /// Slots that received a fresh value
    pub updated: usize,
    /// Slots whose key was absent or held the wrong kind
    pub missing: usize,
    /// Slots whose candidate value failed validation
    pub rejected: usize,
    /// The backing files failed to evaluate; no slot was touched
    pub load_failed: bool,
    /// Wall-clock time the pass took
    pub duration: Duration,
}

/// Evaluates the backing files and pushes fresh values into every slot.
///
/// Passes are serialized per registry. Values are stored slot by slot as the
/// pass goes, so a concurrent reader can observe a pass partway done.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_registry::core::Registry;
/// use hotswap_registry::reload::ReloadEngine;
/// use hotswap_registry::sources::LuaLoader;
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// let seven = registry.declare::<i32>("seven");
///
/// let engine = ReloadEngine::new(
///     Arc::clone(&registry),
///     Arc::new(LuaLoader::new()),
///     vec!["config.lua".into()],
/// );
/// engine.reload()?;
/// println!("seven = {}", seven.get());
/// # Ok::<(), hotswap_registry::error::ConfigError>(())
/// ```
pub struct ReloadEngine {
    registry: Arc<Registry>,
    loader: Arc<dyn ScriptLoader>,
    files: Vec<PathBuf>,
    generation: AtomicU64,
    reports: watch::Sender<ReloadReport>,
    subscribers: SubscriberRegistry,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl ReloadEngine {
    /// Create an engine refreshing `registry` from `files`.
    pub fn new(registry: Arc<Registry>, loader: Arc<dyn ScriptLoader>, files: Vec<PathBuf>) -> Self {
        let (reports, _) = watch::channel(ReloadReport::default());
        Self {
            registry,
            loader,
            files,
            generation: AtomicU64::new(0),
            reports,
            subscribers: SubscriberRegistry::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Record pass metrics.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ReloadMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one full reload pass.
    ///
    /// Script failures, missing keys, kind mismatches and rejected values are
    /// logged and counted in the report; they leave the affected slots at
    /// their previous values and do not fail the pass.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UntypedSlot`] and touches no slot if the
    /// registry holds a slot of the untyped kind.
    pub fn reload(&self) -> Result<ReloadReport> {
        let pass = self.registry.lock_pass();
        let start = Instant::now();

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.start_pass();
        }

        // Read the count before the snapshot so every counted key is in it.
        let observed = self.registry.registration_count();
        let slots = self.registry.snapshot();

        if let Some(slot) = slots.iter().find(|slot| slot.kind() == Kind::Untyped) {
            let err = ConfigError::UntypedSlot(slot.key().to_string());
            error!("{}", err);
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.record_aborted(start);
            }
            return Err(err);
        }

        let mut report = ReloadReport::default();
        match self.loader.load(&self.files) {
            Ok(source) => {
                for slot in &slots {
                    match slot.refresh(source.as_ref()) {
                        SlotOutcome::Updated => report.updated += 1,
                        SlotOutcome::Missing => report.missing += 1,
                        SlotOutcome::Rejected => report.rejected += 1,
                    }
                }
            }
            Err(e) => {
                error!("{}", e);
                report.load_failed = true;
                report.missing = slots.len();
            }
        }

        self.registry.mark_synced(observed);

        report.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        report.duration = start.elapsed();
        debug!(
            generation = report.generation,
            updated = report.updated,
            missing = report.missing,
            rejected = report.rejected,
            load_failed = report.load_failed,
            "Reload pass complete"
        );

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_pass(start, &report, slots.len());
        }

        // Callbacks may start passes of their own.
        drop(pass);

        self.subscribers.notify_all(&report);
        self.reports.send_if_modified(|latest| {
            if report.generation > latest.generation {
                *latest = report.clone();
                true
            } else {
                false
            }
        });
        Ok(report)
    }

    /// The registry this engine refreshes.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The backing files, in evaluation order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Report of the most recent pass.
    pub fn last_report(&self) -> ReloadReport {
        self.reports.borrow().clone()
    }

    /// Receiver that is notified after every pass.
    pub fn reloads(&self) -> watch::Receiver<ReloadReport> {
        self.reports.subscribe()
    }

    /// Register a callback run on the reloading thread after every pass.
    ///
    /// Callbacks run after the pass has released the registry's pass lock,
    /// so a callback may itself call [`reload`](Self::reload). That nested
    /// pass notifies subscribers again; a callback that reloads must stop
    /// itself from doing so unconditionally.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ReloadReport) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }
}
