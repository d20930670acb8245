//! Callback notifications after reload passes.

use crate::reload::ReloadReport;
use parking_lot::RwLock;
use std::sync::Arc;

type Callback = Arc<dyn Fn(&ReloadReport) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed immediately.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let id = self.id;
        self.registry
            .write()
            .subscribers
            .retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Internal subscriber registry state.
struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry of callbacks run after every reload pass.
///
/// Callbacks run on the thread that performed the pass (normally the
/// session's watcher thread) and should return quickly.
///
/// # Examples
///
/// ```rust
/// use hotswap_registry::notify::SubscriberRegistry;
/// use hotswap_registry::reload::ReloadReport;
///
/// let registry = SubscriberRegistry::new();
///
/// let handle = registry.subscribe(|report| {
///     println!("Reload pass {} done", report.generation);
/// });
///
/// registry.notify_all(&ReloadReport::default());
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// assert_eq!(registry.subscriber_count(), 0);
/// ```
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribe to reload passes.
    ///
    /// Returns a handle that can be dropped to unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ReloadReport) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Call every subscriber in subscription order.
    ///
    /// The subscriber list is copied first, so callbacks may subscribe or
    /// drop handles without deadlocking.
    pub fn notify_all(&self, report: &ReloadReport) {
        let callbacks: Vec<Callback> = self
            .inner
            .read()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(report);
        }
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
