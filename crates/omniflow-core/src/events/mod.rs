//! Workflow event distribution.

mod bus;
mod sinks;

pub use bus::EventBus;
pub use sinks::{LogSink, RecordingSink};
