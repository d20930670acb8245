//! Registry slots and the typed handles callers read through.

use crate::core::validation::Validator;
use crate::core::{ConfigValue, Kind};
use crate::reload::fetch;
use crate::sources::ScriptSource;
use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// What a single slot did during a reload pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotOutcome {
    /// A fresh value was stored.
    Updated,
    /// The key was absent or the wrong kind; the value was left alone.
    Missing,
    /// The validator rejected the candidate; the value was left alone.
    Rejected,
}

/// Type-erased refresh entry point used by reload passes.
pub(crate) trait Refresh: Send + Sync {
    fn refresh(&self, source: &dyn ScriptSource, sites: &[String]) -> SlotOutcome;
}

/// Typed storage behind a slot.
///
/// The cell is heap-allocated once and never moves; reloads swap the value
/// pointer inside it.
pub(crate) struct ValueCell<T> {
    key: String,
    value: ArcSwap<T>,
    validator: Option<Validator<T>>,
}

impl<T: ConfigValue> Refresh for ValueCell<T> {
    fn refresh(&self, source: &dyn ScriptSource, sites: &[String]) -> SlotOutcome {
        let Some(candidate) = fetch::<T>(source, &self.key, sites) else {
            return SlotOutcome::Missing;
        };

        if let Some(validator) = &self.validator
            && let Err(e) = validator(&candidate)
        {
            for site in sites {
                error!(key = %self.key, site = %site, "Rejected new value for [{}]: {}", self.key, e);
            }
            return SlotOutcome::Rejected;
        }

        self.value.store(Arc::new(candidate));
        SlotOutcome::Updated
    }
}

/// A registry entry: one key, one kind, one value cell.
pub(crate) struct Slot {
    key: String,
    kind: Kind,
    sites: Mutex<Vec<String>>,
    cell: Arc<dyn Refresh>,
    any: Arc<dyn Any + Send + Sync>,
}

impl Slot {
    /// Create a slot holding `T`'s default value.
    pub(crate) fn new<T: ConfigValue>(
        key: &str,
        site: &str,
        validator: Option<Validator<T>>,
    ) -> (Self, Handle<T>) {
        let cell = Arc::new(ValueCell {
            key: key.to_string(),
            value: ArcSwap::from_pointee(T::default()),
            validator,
        });

        let slot = Self {
            key: key.to_string(),
            kind: T::KIND,
            sites: Mutex::new(vec![site.to_string()]),
            cell: Arc::clone(&cell) as Arc<dyn Refresh>,
            any: Arc::clone(&cell) as Arc<dyn Any + Send + Sync>,
        };

        (slot, Handle { cell })
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    /// Typed handle to this slot, if it holds a `T`.
    pub(crate) fn handle<T: ConfigValue>(&self) -> Option<Handle<T>> {
        Arc::clone(&self.any)
            .downcast::<ValueCell<T>>()
            .ok()
            .map(|cell| Handle { cell })
    }

    /// Record a declaration site. Sites form a set.
    pub(crate) fn add_site(&self, site: &str) {
        let mut sites = self.sites.lock();
        if !sites.iter().any(|s| s == site) {
            sites.push(site.to_string());
        }
    }

    pub(crate) fn sites(&self) -> Vec<String> {
        self.sites.lock().clone()
    }

    pub(crate) fn refresh(&self, source: &dyn ScriptSource) -> SlotOutcome {
        let sites = self.sites();
        self.cell.refresh(source, &sites)
    }
}

/// A typed reference to a registry slot.
///
/// Handles stay valid for the life of the registry and always observe the
/// slot's current value; there is no need to re-declare after a reload.
/// Reads are lock-free and never block.
///
/// # Examples
///
/// ```rust
/// use hotswap_registry::core::Registry;
///
/// let registry = Registry::new();
/// let seven = registry.declare::<i32>("seven");
///
/// // Default until the first reload pass.
/// assert_eq!(*seven.get(), 0);
/// ```
pub struct Handle<T> {
    cell: Arc<ValueCell<T>>,
}

impl<T> Handle<T> {
    /// Get a reference-counted snapshot of the current value.
    pub fn get(&self) -> Arc<T> {
        self.cell.value.load_full()
    }

    /// Borrow the current value without touching the reference count.
    ///
    /// Guards are meant to be short-lived; hold [`get`](Self::get)'s `Arc`
    /// for anything longer.
    pub fn load(&self) -> Guard<Arc<T>> {
        self.cell.value.load()
    }

    /// The dotted key this handle was declared with.
    pub fn key(&self) -> &str {
        &self.cell.key
    }

    /// True when both handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Clone> Handle<T> {
    /// Clone the current value out of the slot.
    pub fn value(&self) -> T {
        T::clone(&self.cell.value.load())
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("key", &self.cell.key)
            .field("value", &self.get())
            .finish()
    }
}
