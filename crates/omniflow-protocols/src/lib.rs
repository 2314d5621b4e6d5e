//! # OmniFlow Protocols
//!
//! Core protocol definitions (traits and shared types) for the OmniFlow engine.
//! Contains only interface definitions and the workflow data model - no execution logic.
//!
//! ## Core Traits
//!
//! - [`Agent`] - Capability provider executing one kind of step
//! - [`WorkflowStore`] - Durable record of workflows and their steps
//! - [`EventSink`] - Consumer of workflow lifecycle events

pub mod agent;
pub mod error;
pub mod event;
pub mod store;
pub mod types;

// Re-export core traits
pub use agent::{Agent, AgentContext, StepInput};
pub use error::{AgentError, StepError, StepErrorKind, StoreError};
pub use event::{EventSink, WorkflowEvent, WorkflowEventKind};
pub use store::{Page, WorkflowFilter, WorkflowStore};
pub use types::*;
