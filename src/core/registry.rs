//! The table of declared keys and their slots.

use crate::core::slot::Slot;
use crate::core::validation::{Bounded, Bounds, Validator};
use crate::core::{ConfigValue, Handle, Kind};
use crate::error::{ConfigError, Result, ValidationError};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Diagnostic description of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotInfo {
    /// Dotted key
    pub key: String,
    /// Kind fixed at first declaration
    pub kind: Kind,
    /// Every site that declared this key, in declaration order
    pub sites: Vec<String>,
}

/// Table mapping configuration keys to typed slots.
///
/// Slots are never removed and never change kind. Each slot's value cell is
/// individually heap-allocated, so inserting new keys never moves storage
/// that earlier [`Handle`]s point at.
///
/// A process-wide instance is available through [`Registry::global`]; tests
/// and embedders can build isolated registries with [`Registry::new`].
///
/// # Examples
///
/// ```rust
/// use hotswap_registry::core::Registry;
///
/// let registry = Registry::new();
/// let a = registry.declare::<String>("name");
/// let b = registry.declare::<String>("name");
///
/// assert!(a.ptr_eq(&b));
/// assert_eq!(registry.declaration_sites("name").unwrap().len(), 2);
/// ```
pub struct Registry {
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    /// Number of slots ever created.
    registered: AtomicU64,
    /// Value of `registered` observed by the last completed reload pass.
    synced: AtomicU64,
    sync_lock: Mutex<()>,
    sync_cv: Condvar,
    pass_lock: Mutex<()>,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            registered: AtomicU64::new(0),
            synced: AtomicU64::new(0),
            sync_lock: Mutex::new(()),
            sync_cv: Condvar::new(),
            pass_lock: Mutex::new(()),
        }
    }

    /// The process-wide registry, created on first access.
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    /// Declare `key` as a `T`, returning a handle to its slot.
    ///
    /// The declaration site recorded for diagnostics is the caller's source
    /// location. Declaring the same key and kind again returns a handle to
    /// the same slot.
    ///
    /// # Panics
    ///
    /// Panics if `key` was already declared with a different kind. This is a
    /// programming defect and is not meant to be recovered from; use
    /// [`try_declare`](Self::try_declare) to handle it as an error instead.
    #[track_caller]
    pub fn declare<T: ConfigValue>(&self, key: &str) -> Handle<T> {
        self.declare_or_die(key, None)
    }

    /// Declare a numeric `key` whose values must lie in `[lower, upper]`.
    ///
    /// Bounds only take effect on the declaration that creates the slot.
    ///
    /// # Panics
    ///
    /// Panics on a kind mismatch, like [`declare`](Self::declare).
    #[track_caller]
    pub fn declare_bounded<T: Bounded>(&self, key: &str, lower: T, upper: T) -> Handle<T> {
        let bounds = Bounds::new(lower, upper);
        if bounds.is_inverted() {
            error!(
                key = %key,
                "Upper bound {} below lower bound {}; every value will be rejected",
                upper, lower
            );
        }
        self.declare_or_die(key, Some(bounds.into_validator()))
    }

    /// Declare `key` with a custom validator run on every fetched value.
    ///
    /// # Panics
    ///
    /// Panics on a kind mismatch, like [`declare`](Self::declare).
    #[track_caller]
    pub fn declare_validated<T, F>(&self, key: &str, validator: F) -> Handle<T>
    where
        T: ConfigValue,
        F: Fn(&T) -> std::result::Result<(), ValidationError> + Send + Sync + 'static,
    {
        let validator: Validator<T> = Arc::new(validator);
        self.declare_or_die(key, Some(validator))
    }

    #[track_caller]
    fn declare_or_die<T: ConfigValue>(
        &self,
        key: &str,
        validator: Option<Validator<T>>,
    ) -> Handle<T> {
        let site = Location::caller().to_string();
        match self.try_declare(key, &site, validator) {
            Ok(handle) => handle,
            Err(e) => {
                error!("{}", e);
                panic!("{}", e);
            }
        }
    }

    /// Get or create the slot for `key`.
    ///
    /// A new slot starts at `T`'s default value and marks the registry dirty
    /// until the next reload pass. An existing slot of the same kind gets
    /// `site` added to its declaration sites; its validator is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KindConflict`] if `key` already exists with a
    /// different kind.
    pub fn try_declare<T: ConfigValue>(
        &self,
        key: &str,
        site: &str,
        validator: Option<Validator<T>>,
    ) -> Result<Handle<T>> {
        let existing = self.slots.read().get(key).cloned();
        if let Some(slot) = existing {
            return Self::join_existing(&slot, site, validator.is_some());
        }

        let mut slots = self.slots.write();
        if let Some(slot) = slots.get(key) {
            return Self::join_existing(slot, site, validator.is_some());
        }

        let (slot, handle) = Slot::new::<T>(key, site, validator);
        slots.insert(key.to_string(), Arc::new(slot));
        self.registered.fetch_add(1, Ordering::SeqCst);
        drop(slots);

        debug!(key = %key, kind = %T::KIND, site = %site, "Registered new key");
        Ok(handle)
    }

    fn join_existing<T: ConfigValue>(
        slot: &Slot,
        site: &str,
        has_validator: bool,
    ) -> Result<Handle<T>> {
        let handle = (slot.kind() == T::KIND)
            .then(|| slot.handle::<T>())
            .flatten()
            .ok_or_else(|| ConfigError::KindConflict {
                key: slot.key().to_string(),
                existing: slot.kind(),
                requested: T::KIND,
                sites: slot.sites().join(", "),
            })?;

        if has_validator {
            warn!(
                key = %slot.key(),
                site = %site,
                "Ignoring validator on repeated declaration; the first declaration's validation applies"
            );
        }
        slot.add_site(site);
        Ok(handle)
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True if no key has been declared.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// True if `key` has been declared.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    /// Kind of a declared key.
    pub fn kind_of(&self, key: &str) -> Option<Kind> {
        self.slots.read().get(key).map(|slot| slot.kind())
    }

    /// Declaration sites recorded for a key.
    pub fn declaration_sites(&self, key: &str) -> Option<Vec<String>> {
        self.slots.read().get(key).map(|slot| slot.sites())
    }

    /// Describe every slot, sorted by key.
    pub fn describe(&self) -> Vec<SlotInfo> {
        let mut infos: Vec<SlotInfo> = self
            .slots
            .read()
            .values()
            .map(|slot| SlotInfo {
                key: slot.key().to_string(),
                kind: slot.kind(),
                sites: slot.sites(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// True if a key was registered after the last completed reload pass.
    ///
    /// Values of freshly declared keys are not meaningful until this clears.
    pub fn is_dirty(&self) -> bool {
        self.registered.load(Ordering::SeqCst) > self.synced.load(Ordering::SeqCst)
    }

    /// Block until a reload pass has observed every registered key.
    ///
    /// Returns `false` if `timeout` elapsed first, e.g. because no session
    /// is running.
    pub fn wait_until_synced(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.sync_lock.lock();
        while self.is_dirty() {
            if self.sync_cv.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_dirty();
            }
        }
        true
    }

    /// Registration count; read before taking a snapshot for a pass.
    pub(crate) fn registration_count(&self) -> u64 {
        self.registered.load(Ordering::SeqCst)
    }

    /// All slots, in arbitrary order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Slot>> {
        self.slots.read().values().cloned().collect()
    }

    /// Record that a pass has refreshed every slot counted in `observed`.
    ///
    /// Keys registered while the pass ran keep the registry dirty.
    pub(crate) fn mark_synced(&self, observed: u64) {
        self.synced.fetch_max(observed, Ordering::SeqCst);
        let _guard = self.sync_lock.lock();
        self.sync_cv.notify_all();
    }

    /// Serializes reload passes against this registry.
    pub(crate) fn lock_pass(&self) -> MutexGuard<'_, ()> {
        self.pass_lock.lock()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Declare `key` in the process-wide registry.
///
/// # Panics
///
/// Panics if `key` was already declared with a different kind.
#[track_caller]
pub fn declare<T: ConfigValue>(key: &str) -> Handle<T> {
    Registry::global().declare(key)
}

/// Declare a bounded numeric `key` in the process-wide registry.
///
/// # Panics
///
/// Panics if `key` was already declared with a different kind.
#[track_caller]
pub fn declare_bounded<T: Bounded>(key: &str, lower: T, upper: T) -> Handle<T> {
    Registry::global().declare_bounded(key, lower, upper)
}
