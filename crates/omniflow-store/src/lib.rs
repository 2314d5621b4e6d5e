//! # OmniFlow Store
//!
//! [`WorkflowStore`] implementations:
//!
//! - [`MemoryWorkflowStore`] - process-local, for tests and one-shot runs
//! - [`FileWorkflowStore`] - one JSON document per workflow, grouped by status

mod file;
mod memory;

pub use file::FileWorkflowStore;
pub use memory::MemoryWorkflowStore;

use std::sync::Arc;

use omniflow_config::{StoreBackend, StoreConfig, omniflow_dir};
use omniflow_protocols::{StoreError, WorkflowStore};

/// Open the store selected by configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn WorkflowStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryWorkflowStore::new())),
        StoreBackend::File => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| omniflow_dir().join("workflows"));
            Ok(Arc::new(FileWorkflowStore::new(path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniflow_protocols::{Workflow, WorkflowRequest};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::default()).await.unwrap();
        let wf = Workflow::from_request(WorkflowRequest::new("u"));
        store.save(&wf).await.unwrap();
        assert!(store.find_by_id(&wf.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::File,
            path: Some(temp_dir.path().to_path_buf()),
        };
        let store = open_store(&config).await.unwrap();
        let wf = Workflow::from_request(WorkflowRequest::new("u"));
        store.save(&wf).await.unwrap();
        assert!(temp_dir.path().join("workflows").exists());
    }
}
