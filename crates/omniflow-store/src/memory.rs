//! In-memory workflow store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use omniflow_protocols::{Page, StoreError, Workflow, WorkflowFilter, WorkflowStore};

/// In-memory workflow store.
pub struct MemoryWorkflowStore {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }
}

impl Default for MemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(id).cloned())
    }

    async fn find_by_filter(&self, filter: &WorkflowFilter) -> Result<Page<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        let matched: Vec<Workflow> = workflows
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        Ok(filter.apply(matched))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut workflows = self.workflows.write().await;
        Ok(workflows.remove(id).is_some())
    }
}
