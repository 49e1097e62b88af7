mod negotiation_config;

pub use negotiation_config::*;
