mod relay;

pub use relay::*;
