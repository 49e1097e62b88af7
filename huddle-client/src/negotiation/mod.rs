mod candidate_buffer;
mod context;
mod glare;
mod negotiator;
mod recovery;
mod state;
mod timers;

pub use candidate_buffer::*;
pub use context::*;
pub use glare::*;
pub use negotiator::*;
pub use recovery::*;
pub use state::*;
pub use timers::*;
