//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_engine;
mod schema_infra;

pub use schema_engine::*;
pub use schema_infra::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub failure: FailureConfig,

    #[serde(default)]
    pub cancellation: CancellationConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
