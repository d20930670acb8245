//! Core registry types: kinds, slots, handles, and sessions.

mod builder;
mod registry;
mod session;
mod slot;
mod validation;
mod value;

pub use builder::SessionBuilder;
pub use registry::{Registry, SlotInfo, declare, declare_bounded};
pub use session::ConfigSession;
pub use slot::Handle;
pub(crate) use slot::SlotOutcome;
pub use validation::{Bounded, Bounds, Validator};
pub use value::{ConfigValue, Kind, Vector2, Vector3};
