//! Agent registry.
//!
//! Pure name to capability mapping. Registration replaces any previous binding
//! under the same name, so tests and demos can hot-swap agents.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use omniflow_protocols::{Agent, AgentError};

/// Registry for capability providers, keyed by [`Agent::name`].
pub struct AgentRegistry {
    agents: DashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    /// Register an agent, returning the binding it replaced.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let name = agent.name().to_string();
        let previous = self.agents.insert(name.clone(), agent);
        if previous.is_some() {
            debug!("Replaced agent binding: {}", name);
        } else {
            debug!("Registered agent: {}", name);
        }
        previous
    }

    /// Remove an agent by name.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.remove(name).map(|(_, agent)| agent)
    }

    /// Resolve an agent by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Agent>, AgentError> {
        self.agents
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AgentError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered agent names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
