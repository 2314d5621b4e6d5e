//! Agent registration for the CLI.

use std::sync::Arc;

use tracing::{info, warn};

use omniflow_agents_mock::register_mock_agents;
use omniflow_core::AgentRegistry;
use omniflow_protocols::WorkflowRequest;

/// Build a registry holding the built-in mock agents.
pub(crate) fn build_registry() -> Arc<AgentRegistry> {
    let registry = Arc::new(AgentRegistry::new());
    let names = register_mock_agents(&registry);
    info!("Registered {} agents: {}", names.len(), names.join(", "));
    registry
}

/// Agents the plan names that nothing provides. Such steps fail when dispatched.
pub(crate) fn missing_agents(registry: &AgentRegistry, request: &WorkflowRequest) -> Vec<String> {
    let mut missing: Vec<String> = request
        .steps
        .iter()
        .filter(|s| !registry.contains(&s.agent))
        .map(|s| s.agent.clone())
        .collect();
    missing.sort();
    missing.dedup();

    for agent in &missing {
        warn!("No agent registered as '{}'", agent);
    }
    missing
}
