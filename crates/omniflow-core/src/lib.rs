//! # OmniFlow Core
//!
//! Shared runtime services for the OmniFlow engine.
//!
//! ## Components
//!
//! - [`AgentRegistry`] - Name to capability-provider mapping, resolved at dispatch time
//! - [`EventBus`] - Broadcast of workflow lifecycle events to subscribers and sinks

pub mod events;
pub mod registry;

pub use events::{EventBus, LogSink, RecordingSink};
pub use registry::AgentRegistry;
