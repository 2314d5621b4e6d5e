use super::*;
use chrono::{Duration, Utc};
use omniflow_protocols::{StepKind, StepSpec, WorkflowRequest, WorkflowResult};
use tempfile::TempDir;

fn workflow(owner: &str) -> Workflow {
    Workflow::from_request(
        WorkflowRequest::new(owner).step(StepSpec::new("search", StepKind::Search, "search")),
    )
}

#[tokio::test]
async fn test_creates_status_directories() {
    let temp_dir = TempDir::new().unwrap();
    let _store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    for status in ["pending", "running", "paused", "completed", "failed", "cancelled"] {
        assert!(temp_dir.path().join("workflows").join(status).is_dir());
    }
}

#[tokio::test]
async fn test_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    let wf = workflow("alice");
    store.save(&wf).await.unwrap();

    let loaded = store.find_by_id(&wf.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, wf.id);
    assert_eq!(loaded.steps.len(), 1);
    assert_eq!(loaded.steps[0].kind, StepKind::Search);
}

#[tokio::test]
async fn test_status_change_moves_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    let mut wf = workflow("alice");
    store.save(&wf).await.unwrap();
    let pending_path = temp_dir
        .path()
        .join("workflows/pending")
        .join(format!("{}.json", wf.id));
    assert!(pending_path.exists());

    wf.status = WorkflowStatus::Running;
    store.save(&wf).await.unwrap();
    wf.finish(WorkflowStatus::Completed, WorkflowResult::empty());
    store.save(&wf).await.unwrap();

    assert!(!pending_path.exists());
    let completed_path = temp_dir
        .path()
        .join("workflows/completed")
        .join(format!("{}.json", wf.id));
    assert!(completed_path.exists());

    let loaded = store.find_by_id(&wf.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Completed);
    assert!(loaded.result.is_some());
}

#[tokio::test]
async fn test_stale_copy_does_not_shadow_latest() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    let mut wf = workflow("alice");
    store.save(&wf).await.unwrap();
    let pending_path = temp_dir
        .path()
        .join("workflows/pending")
        .join(format!("{}.json", wf.id));
    let stale = tokio::fs::read_to_string(&pending_path).await.unwrap();

    wf.finish(WorkflowStatus::Completed, WorkflowResult::empty());
    wf.updated_at = Utc::now() + Duration::seconds(5);
    store.save(&wf).await.unwrap();

    // A crash between writing the new copy and removing the old one.
    tokio::fs::write(&pending_path, stale).await.unwrap();

    let loaded = store.find_by_id(&wf.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Completed);

    let all = store.find_by_filter(&WorkflowFilter::new()).await.unwrap();
    assert_eq!(all.total, 1);
    assert_eq!(all.items[0].status, WorkflowStatus::Completed);

    let pending = store
        .find_by_filter(&WorkflowFilter::new().status(WorkflowStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.total, 0);

    // The next save clears every leftover copy.
    store.save(&wf).await.unwrap();
    assert!(!pending_path.exists());

    assert!(store.delete(&wf.id).await.unwrap());
    assert!(store.find_by_id(&wf.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_filter() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    let mut old = workflow("alice");
    old.created_at = Utc::now() - Duration::days(2);
    old.status = WorkflowStatus::Failed;
    store.save(&old).await.unwrap();
    store.save(&workflow("alice")).await.unwrap();
    store.save(&workflow("bob")).await.unwrap();

    let page = store
        .find_by_filter(&WorkflowFilter::new().owner("alice"))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.last().unwrap().id, old.id);

    let page = store
        .find_by_filter(&WorkflowFilter::new().status(WorkflowStatus::Failed))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);

    let now = Utc::now();
    let page = store
        .find_by_filter(&WorkflowFilter::new().created_between(now - Duration::days(1), now + Duration::minutes(1)))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_unreadable_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();
    store.save(&workflow("alice")).await.unwrap();

    tokio::fs::write(temp_dir.path().join("workflows/pending/broken.json"), "{not json")
        .await
        .unwrap();

    let page = store.find_by_filter(&WorkflowFilter::new()).await.unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_delete() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();

    let wf = workflow("alice");
    store.save(&wf).await.unwrap();
    assert!(store.delete(&wf.id).await.unwrap());
    assert!(!store.delete(&wf.id).await.unwrap());
    assert!(store.find_by_id(&wf.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_persistence_across_instances() {
    let temp_dir = TempDir::new().unwrap();
    let wf = workflow("alice");
    {
        let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();
        store.save(&wf).await.unwrap();
    }

    let store = FileWorkflowStore::new(temp_dir.path()).await.unwrap();
    assert!(store.find_by_id(&wf.id).await.unwrap().is_some());
}
