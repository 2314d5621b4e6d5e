use super::*;
use crate::types::WorkflowRequest;
use chrono::Duration;

fn workflow(owner: &str, status: WorkflowStatus, age_minutes: i64) -> Workflow {
    let mut wf = Workflow::from_request(WorkflowRequest::new(owner));
    wf.status = status;
    wf.created_at = Utc::now() - Duration::minutes(age_minutes);
    wf
}

#[test]
fn test_filter_matches_owner_and_status() {
    let wf = workflow("alice", WorkflowStatus::Running, 0);

    assert!(WorkflowFilter::new().matches(&wf));
    assert!(WorkflowFilter::new().owner("alice").matches(&wf));
    assert!(!WorkflowFilter::new().owner("bob").matches(&wf));
    assert!(WorkflowFilter::new().status(WorkflowStatus::Running).matches(&wf));
    assert!(!WorkflowFilter::new().status(WorkflowStatus::Failed).matches(&wf));
}

#[test]
fn test_filter_time_range() {
    let wf = workflow("alice", WorkflowStatus::Completed, 30);
    let now = Utc::now();

    let window = WorkflowFilter::new().created_between(now - Duration::hours(1), now);
    assert!(window.matches(&wf));

    let later = WorkflowFilter::new().created_between(now - Duration::minutes(10), now);
    assert!(!later.matches(&wf));
}

#[test]
fn test_apply_sorts_newest_first_and_paginates() {
    let workflows = vec![
        workflow("alice", WorkflowStatus::Completed, 30),
        workflow("alice", WorkflowStatus::Completed, 10),
        workflow("bob", WorkflowStatus::Completed, 5),
        workflow("alice", WorkflowStatus::Failed, 20),
    ];
    let newest_alice = workflows[1].id.clone();

    let page = WorkflowFilter::new().owner("alice").page(0, 2).apply(workflows.clone());
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, newest_alice);
    assert!(page.has_more());

    let page = WorkflowFilter::new().owner("alice").page(2, 2).apply(workflows);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_more());
}

#[test]
fn test_default_limit() {
    let filter: WorkflowFilter = serde_json::from_str("{}").unwrap();
    assert_eq!(filter.limit, 50);
    assert_eq!(filter.offset, 0);
}
