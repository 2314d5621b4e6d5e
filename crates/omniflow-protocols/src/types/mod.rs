//! Workflow data model shared across the OmniFlow crates.

mod common;
mod request;
mod step;
mod workflow;

pub use common::*;
pub use request::*;
pub use step::*;
pub use workflow::*;
