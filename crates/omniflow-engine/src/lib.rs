//! # OmniFlow Engine
//!
//! Workflow orchestration for OmniFlow.
//!
//! ## Features
//!
//! - Step graph validation (unique ids, known dependencies, acyclic)
//! - Event-driven scheduling with priority ordering and bounded parallelism
//! - Transitive skip of steps whose dependencies failed
//! - Per-step retries with capped exponential backoff and attempt timeouts
//! - Pause, resume, and cooperative or abandoning cancellation
//! - Result aggregation with minimum-confidence reporting

pub mod aggregate;
pub mod error;
pub mod executor;
pub mod graph;
pub mod orchestrator;
mod orchestrator_dispatch;
pub mod retry;
mod run;
pub mod scheduler;

pub use error::{EngineError, EngineResult};
pub use graph::{topological_order, validate_request};
pub use orchestrator::Orchestrator;
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::SchedulePass;
