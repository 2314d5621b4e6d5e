//! File system based workflow store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use omniflow_protocols::{Page, StoreError, Workflow, WorkflowFilter, WorkflowStatus, WorkflowStore};

const STATUSES: [WorkflowStatus; 6] = [
    WorkflowStatus::Pending,
    WorkflowStatus::Running,
    WorkflowStatus::Paused,
    WorkflowStatus::Completed,
    WorkflowStatus::Failed,
    WorkflowStatus::Cancelled,
];

/// Workflows stored as individual JSON files organized by status:
/// ```text
/// {storage_path}/
/// └── workflows/
///     ├── pending/
///     │   └── {id}.json
///     ├── running/
///     ├── paused/
///     ├── completed/
///     ├── failed/
///     └── cancelled/
/// ```
/// Writes go to a temporary file first and are renamed into place. If a
/// crash leaves copies in several status directories, the copy with the
/// latest `updated_at` wins on every read.
pub struct FileWorkflowStore {
    storage_path: PathBuf,
}

impl FileWorkflowStore {
    /// Create a new file-based store, creating the status directories.
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage_path = storage_path.into();
        let store = Self { storage_path };

        for status in STATUSES {
            let dir = store.status_dir(status);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create {} directory: {}", status, e))
            })?;
        }

        debug!("FileWorkflowStore initialized at {:?}", store.storage_path);
        Ok(store)
    }

    fn workflows_dir(&self) -> PathBuf {
        self.storage_path.join("workflows")
    }

    fn status_dir(&self, status: WorkflowStatus) -> PathBuf {
        self.workflows_dir().join(status.as_str())
    }

    fn workflow_path(&self, id: &str, status: WorkflowStatus) -> PathBuf {
        self.status_dir(status).join(format!("{}.json", id))
    }

    /// Every copy of a workflow file, in status order.
    fn workflow_files(&self, id: &str) -> Vec<(PathBuf, WorkflowStatus)> {
        STATUSES
            .into_iter()
            .map(|status| (self.workflow_path(id, status), status))
            .filter(|(path, _)| path.exists())
            .collect()
    }

    async fn read_workflow(path: &Path) -> Result<Workflow, StoreError> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            StoreError::Storage(format!("Failed to read workflow file {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load every readable workflow from one status directory.
    async fn load_dir(&self, status: WorkflowStatus) -> Result<Vec<Workflow>, StoreError> {
        let dir = self.status_dir(status);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut workflows = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to read {} directory: {}", status, e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match Self::read_workflow(&path).await {
                    Ok(workflow) => workflows.push(workflow),
                    Err(e) => warn!("Skipping unreadable workflow file {:?}: {}", path, e),
                }
            }
        }

        Ok(workflows)
    }
}

/// Keep one snapshot per id: the most recently updated, later status on a tie.
///
/// Input is expected in status order.
fn latest_snapshots(workflows: impl IntoIterator<Item = Workflow>) -> Vec<Workflow> {
    let mut latest: HashMap<String, Workflow> = HashMap::new();
    for workflow in workflows {
        match latest.entry(workflow.id.clone()) {
            Entry::Occupied(mut entry) => {
                if workflow.updated_at >= entry.get().updated_at {
                    entry.insert(workflow);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(workflow);
            }
        }
    }
    latest.into_values().collect()
}

#[async_trait]
impl WorkflowStore for FileWorkflowStore {
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let path = self.workflow_path(&workflow.id, workflow.status);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(workflow)?;
        fs::write(&tmp_path, content).await.map_err(|e| {
            StoreError::Storage(format!("Failed to write workflow file: {}", e))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            StoreError::Storage(format!("Failed to move workflow file into place: {}", e))
        })?;

        for (old_path, old_status) in self.workflow_files(&workflow.id) {
            if old_status == workflow.status {
                continue;
            }
            if let Err(e) = fs::remove_file(&old_path).await {
                warn!("Failed to remove stale workflow file {:?}: {}", old_path, e);
            }
        }

        debug!("Saved workflow '{}' to {:?}", workflow.id, path);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        let files = self.workflow_files(id);
        let mut copies = Vec::with_capacity(files.len());
        let mut last_error = None;

        for (path, _) in files {
            match Self::read_workflow(&path).await {
                Ok(workflow) => copies.push(workflow),
                Err(e) => {
                    warn!("Skipping unreadable workflow file {:?}: {}", path, e);
                    last_error = Some(e);
                }
            }
        }

        if copies.is_empty() {
            return match last_error {
                Some(e) => Err(e),
                None => Ok(None),
            };
        }
        Ok(latest_snapshots(copies).pop())
    }

    async fn find_by_filter(&self, filter: &WorkflowFilter) -> Result<Page<Workflow>, StoreError> {
        // Every directory is read so a stale copy cannot stand in for the real one.
        let mut workflows = Vec::new();
        for status in STATUSES {
            workflows.extend(self.load_dir(status).await?);
        }

        Ok(filter.apply(latest_snapshots(workflows)))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let files = self.workflow_files(id);
        if files.is_empty() {
            return Ok(false);
        }
        for (path, _) in files {
            fs::remove_file(&path).await.map_err(|e| {
                StoreError::Storage(format!("Failed to delete workflow file: {}", e))
            })?;
        }
        debug!("Deleted workflow '{}'", id);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
