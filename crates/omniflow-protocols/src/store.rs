//! Workflow store protocol definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{Workflow, WorkflowStatus};

/// Durable record of workflows.
///
/// Implementations must provide read-your-writes consistency per workflow id.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert or replace a workflow.
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, StoreError>;

    /// Query workflows, newest first.
    async fn find_by_filter(&self, filter: &WorkflowFilter) -> Result<Page<Workflow>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

fn default_limit() -> usize {
    50
}

/// Query parameters for [`WorkflowStore::find_by_filter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFilter {
    #[serde(default)]
    pub owner_id: Option<String>,

    #[serde(default)]
    pub status: Option<WorkflowStatus>,

    /// Inclusive lower bound on `created_at`.
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,

    /// Exclusive upper bound on `created_at`.
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,

    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for WorkflowFilter {
    fn default() -> Self {
        Self {
            owner_id: None,
            status: None,
            created_after: None,
            created_before: None,
            offset: 0,
            limit: default_limit(),
        }
    }
}

impl WorkflowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.created_after = Some(after);
        self.created_before = Some(before);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn matches(&self, workflow: &Workflow) -> bool {
        if let Some(ref owner) = self.owner_id {
            if &workflow.owner_id != owner {
                return false;
            }
        }
        if let Some(status) = self.status {
            if workflow.status != status {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if workflow.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if workflow.created_at >= before {
                return false;
            }
        }
        true
    }

    /// Filters, sorts newest first, and slices the requested page.
    pub fn apply<I>(&self, workflows: I) -> Page<Workflow>
    where
        I: IntoIterator<Item = Workflow>,
    {
        let mut matched: Vec<Workflow> = workflows.into_iter().filter(|w| self.matches(w)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();

        Page {
            items,
            total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matches before pagination.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.offset + self.items.len() < self.total
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
