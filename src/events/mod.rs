pub mod bus;
pub mod kind;

pub use bus::{Event, EventBus};
pub use kind::EventKind;
