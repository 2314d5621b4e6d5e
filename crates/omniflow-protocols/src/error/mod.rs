//! Error types for the OmniFlow protocol layer.

mod agent;
mod step;
mod store;

pub use agent::*;
pub use step::*;
pub use store::*;
