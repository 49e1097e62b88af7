mod config;
mod error;
mod link;
mod media;
mod negotiation;
mod session;
mod transport;

pub use config::*;
pub use error::*;
pub use link::*;
pub use media::*;
pub use negotiation::*;
pub use session::*;
pub use transport::*;
