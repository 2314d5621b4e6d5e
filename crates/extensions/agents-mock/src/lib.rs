//! Mock capability providers for OmniFlow.
//!
//! [`MockAgent`] answers every step kind with canned data, so plans can be run
//! end to end without any external service. [`ScriptedAgent`] replays a fixed
//! sequence of successes and failures and counts its invocations.

mod mock;
mod scripted;

pub use mock::{MockAgent, default_agent_name};
pub use scripted::{Outcome, ScriptedAgent};

use std::sync::Arc;

use omniflow_core::AgentRegistry;
use omniflow_protocols::StepKind;

/// Register one [`MockAgent`] per step kind under its default name.
pub fn register_mock_agents(registry: &AgentRegistry) -> Vec<String> {
    StepKind::ALL
        .iter()
        .map(|&kind| {
            registry.register(Arc::new(MockAgent::new(kind)));
            default_agent_name(kind).to_string()
        })
        .collect()
}
