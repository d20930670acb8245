//! File watching with debounced reloads.
//!
//! One background thread per session waits on filesystem events with a
//! bounded timeout and drives a small state machine:
//!
//! - `Armed`: waiting for a change to a watched file.
//! - `Debouncing`: a change was seen; more changes keep extending the wait.
//!   Once the quiet interval (two poll periods) passes with no new change,
//!   one reload pass runs and the watcher re-arms.
//! - A key registered after the watcher started forces a reload on the next
//!   wake, whatever the state.
//! - `Stopping`: the owning session asked the thread to exit.

use crate::error::{ConfigError, Result};
use crate::reload::ReloadEngine;
use ::notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::HashSet;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Default bounded wait for filesystem events.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Watcher lifecycle and debounce states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Not started.
    Idle,
    /// Running the synchronous initial load.
    PendingInitialLoad,
    /// Waiting for a change.
    Armed,
    /// A change was seen; waiting for the files to settle.
    Debouncing {
        /// When the most recent qualifying change was seen
        last_change: Instant,
    },
    /// Stop requested.
    Stopping,
    /// Thread exited.
    Stopped,
}

/// What the watcher observed on one wake.
#[derive(Debug, Clone, Copy)]
pub struct Wake {
    /// Time of the wake
    pub now: Instant,
    /// A qualifying change to a watched file arrived since the last wake
    pub changed: bool,
    /// The registry has keys no reload pass has seen yet
    pub dirty: bool,
    /// The owning session asked the watcher to stop
    pub stop: bool,
}

/// What the watcher should do after a wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    Wait,
    /// Run one reload pass.
    Reload,
}

/// Advance the debounce state machine by one wake.
///
/// `quiet` is how long the files must stay unchanged before a pending change
/// triggers a reload.
pub fn step(state: WatchState, wake: Wake, quiet: Duration) -> (WatchState, Action) {
    if wake.stop {
        return (WatchState::Stopping, Action::Wait);
    }

    match state {
        WatchState::Stopping | WatchState::Stopped => return (state, Action::Wait),
        WatchState::Idle | WatchState::PendingInitialLoad => return (state, Action::Wait),
        WatchState::Armed | WatchState::Debouncing { .. } => {}
    }

    if wake.dirty {
        // A change seen on the same wake may be a half-written file, so keep
        // debouncing it after the immediate pass.
        let next = if wake.changed {
            WatchState::Debouncing {
                last_change: wake.now,
            }
        } else {
            WatchState::Armed
        };
        return (next, Action::Reload);
    }

    match state {
        _ if wake.changed => (
            WatchState::Debouncing {
                last_change: wake.now,
            },
            Action::Wait,
        ),
        WatchState::Debouncing { last_change }
            if wake.now.saturating_duration_since(last_change) > quiet =>
        {
            (WatchState::Armed, Action::Reload)
        }
        other => (other, Action::Wait),
    }
}

/// Background watcher owned by a session.
///
/// Dropping or [`stop`](Self::stop)ping it blocks until the thread has
/// exited, so no reload pass runs afterwards.
pub struct ConfigWatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    watched_dirs: Vec<PathBuf>,
    poll_interval: Duration,
}

impl ConfigWatcher {
    /// Run the initial load, watch the files' parent directories, and start
    /// the watcher thread.
    ///
    /// Directories are watched rather than files so that editors replacing a
    /// file by rename are still seen. A file whose directory cannot be
    /// watched is logged and skipped; it is still refreshed whenever another
    /// file triggers a pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watcher cannot be created or the thread
    /// cannot be spawned.
    pub fn start(engine: Arc<ReloadEngine>, poll_interval: Duration) -> Result<Self> {
        trace!(state = ?WatchState::PendingInitialLoad, "Config watcher starting");
        if let Err(e) = engine.reload() {
            error!("Initial reload failed: {}", e);
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = ::notify::recommended_watcher(tx)
            .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        let mut targets = HashSet::new();
        let mut watched_dirs = Vec::new();
        for file in engine.files() {
            let (dir, target) = match watch_target(file) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(file = %file.display(), "Couldn't add watch to the file: {}", e);
                    continue;
                }
            };

            if !watched_dirs.contains(&dir) {
                if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                    warn!(
                        file = %file.display(),
                        dir = %dir.display(),
                        "Couldn't add watch to the file: {}",
                        e
                    );
                    continue;
                }
                info!("Watching config directory: {}", dir.display());
                watched_dirs.push(dir);
            }
            targets.insert(target);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker = WatchLoop {
            engine,
            rx,
            targets,
            stop: Arc::clone(&stop),
            poll_interval,
        };

        let thread = thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || worker.run(watcher))?;

        Ok(Self {
            stop,
            thread: Some(thread),
            watched_dirs,
            poll_interval,
        })
    }

    /// Signal the thread to stop and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Config watcher thread panicked");
        }
    }

    /// True until [`stop`](Self::stop) has run.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Directories with an active watch.
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }

    /// Bounded wait used by the watcher thread.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Canonical parent directory of `file`, and the path events will carry for it.
fn watch_target(file: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
    let name = file.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let parent = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let dir = parent.canonicalize()?;
    let target = dir.join(name);
    Ok((dir, target))
}

struct WatchLoop {
    engine: Arc<ReloadEngine>,
    rx: Receiver<::notify::Result<Event>>,
    targets: HashSet<PathBuf>,
    stop: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl WatchLoop {
    fn run(self, watcher: RecommendedWatcher) {
        let quiet = self.poll_interval * 2;
        let mut state = WatchState::Armed;
        debug!(files = self.targets.len(), "Config watcher armed");

        while state != WatchState::Stopping {
            let wake = Wake {
                changed: self.wait_for_change(),
                now: Instant::now(),
                dirty: self.engine.registry().is_dirty(),
                stop: self.stop.load(Ordering::SeqCst),
            };

            let (next, action) = step(state, wake, quiet);
            if mem::discriminant(&next) != mem::discriminant(&state) {
                trace!(from = ?state, to = ?next, "Config watcher state change");
            }
            state = next;

            if action == Action::Reload
                && let Err(e) = self.engine.reload()
            {
                error!("Reload pass failed: {}", e);
            }
        }

        drop(watcher);
        debug!(state = ?WatchState::Stopped, "Config watcher stopped");
    }

    /// Wait up to one poll interval, then drain whatever else is queued.
    fn wait_for_change(&self) -> bool {
        let mut changed = match self.rx.recv_timeout(self.poll_interval) {
            Ok(res) => self.is_relevant(res),
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(self.poll_interval);
                return false;
            }
        };

        while let Ok(res) = self.rx.try_recv() {
            changed |= self.is_relevant(res);
        }
        changed
    }

    fn is_relevant(&self, res: ::notify::Result<Event>) -> bool {
        match res {
            Ok(event) => {
                matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| self.targets.contains(p))
            }
            Err(e) => {
                warn!("File watcher error: {}", e);
                false
            }
        }
    }
}
