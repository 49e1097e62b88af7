mod membership_event;
mod room_registry;

pub use membership_event::*;
pub use room_registry::*;
