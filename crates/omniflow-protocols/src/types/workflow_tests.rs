use super::*;
use crate::types::{StepKind, StepSpec};

fn booking_request() -> WorkflowRequest {
    WorkflowRequest::new("user-1")
        .with_type(WorkflowType::Booking)
        .with_priority(WorkflowPriority::High)
        .with_request_text("Book a table for two tonight")
        .step(StepSpec::new("understand", StepKind::LanguageUnderstanding, "nlp").with_estimate_ms(200))
        .step(
            StepSpec::new("search", StepKind::Search, "search")
                .depends_on(["understand"])
                .with_estimate_ms(800),
        )
        .step(StepSpec::new("call", StepKind::Call, "caller").depends_on(["search"]))
}

#[test]
fn test_from_request() {
    let wf = Workflow::from_request(booking_request());

    assert_eq!(wf.status, WorkflowStatus::Pending);
    assert_eq!(wf.owner_id, "user-1");
    assert_eq!(wf.workflow_type, WorkflowType::Booking);
    assert_eq!(wf.steps.len(), 3);
    assert_eq!(wf.steps[1].metadata.dependencies, vec!["understand".to_string()]);
    assert_eq!(wf.estimated_duration_ms, 1000);
    assert!(wf.result.is_none());
    assert!(wf.started_at.is_none());
    assert!(!wf.id.is_empty());
}

#[test]
fn test_priority_ordering() {
    assert!(WorkflowPriority::Urgent > WorkflowPriority::High);
    assert!(WorkflowPriority::High > WorkflowPriority::Normal);
    assert!(WorkflowPriority::Normal > WorkflowPriority::Low);
    assert_eq!(WorkflowPriority::default(), WorkflowPriority::Normal);
}

#[test]
fn test_status_transitions() {
    use WorkflowStatus::*;
    assert!(Pending.can_transition_to(Running));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Running.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Running));
    assert!(Running.can_transition_to(Failed));

    assert!(!Pending.can_transition_to(Completed));
    assert!(!Completed.can_transition_to(Running));
    assert!(!Cancelled.can_transition_to(Running));
    assert!(!Failed.can_transition_to(Cancelled));
}

#[test]
fn test_status_from_str() {
    assert_eq!("running".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Running));
    assert_eq!("Canceled".parse::<WorkflowStatus>(), Ok(WorkflowStatus::Cancelled));
    assert!("sleeping".parse::<WorkflowStatus>().is_err());
}

#[test]
fn test_current_step_is_first_pending() {
    let mut wf = Workflow::from_request(booking_request());
    wf.refresh_current_step();
    assert_eq!(wf.current_step, 0);

    wf.steps[0].status = StepStatus::Completed;
    wf.steps[1].status = StepStatus::Running;
    wf.refresh_current_step();
    assert_eq!(wf.current_step, 2);
}

#[test]
fn test_finish_sets_result_once_terminal() {
    let mut wf = Workflow::from_request(WorkflowRequest::new("user-1"));
    wf.started_at = Some(Utc::now());
    wf.finish(WorkflowStatus::Completed, WorkflowResult::empty());

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert!(wf.result.as_ref().unwrap().success);
    assert!(wf.completed_at.is_some());
    assert!(wf.actual_duration_ms.is_some());
    assert!(!wf.has_unsettled_steps());
}

#[test]
fn test_workflow_json_roundtrip_keeps_status() {
    let wf = Workflow::from_request(booking_request());
    let json = serde_json::to_string(&wf).unwrap();
    assert!(json.contains("\"status\":\"pending\""));

    let back: Workflow = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, wf.id);
    assert_eq!(back.steps.len(), 3);
}
