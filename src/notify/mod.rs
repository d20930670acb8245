//! Change detection and reload notifications.
//!
//! [`ConfigWatcher`] watches the backing files and drives debounced reload
//! passes; [`SubscriberRegistry`] runs callbacks after each pass.

pub mod subscriber;
pub mod watcher;

pub use subscriber::{SubscriberRegistry, SubscriptionHandle};
pub use watcher::{Action, ConfigWatcher, DEFAULT_POLL_INTERVAL, Wake, WatchState, step};
