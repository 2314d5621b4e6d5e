use super::*;
use chrono::Utc;
use omniflow_protocols::{StepErrorKind, StepKind, StepSpec, WorkflowRequest};

fn spec(id: &str) -> StepSpec {
    StepSpec::new(id, StepKind::Search, "search")
}

fn workflow(request: WorkflowRequest) -> Workflow {
    Workflow::from_request(request)
}

fn set_status(wf: &mut Workflow, id: &str, status: StepStatus) {
    wf.step_mut(id).unwrap().status = status;
}

#[test]
fn test_roots_are_ready() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b"))
            .step(spec("c").depends_on(["a", "b"])),
    );

    let pass = plan(&mut wf, 10);
    assert!(pass.skipped.is_empty());
    assert_eq!(pass.ready, vec!["a", "b"]);
}

#[test]
fn test_dependent_waits_for_all_dependencies() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b"))
            .step(spec("c").depends_on(["a", "b"])),
    );
    set_status(&mut wf, "a", StepStatus::Completed);
    set_status(&mut wf, "b", StepStatus::Running);
    assert_eq!(plan(&mut wf, 10).ready, Vec::<String>::new());

    set_status(&mut wf, "b", StepStatus::Completed);
    assert_eq!(plan(&mut wf, 10).ready, vec!["c"]);
}

#[test]
fn test_priority_then_plan_order() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("low").with_priority(1))
            .step(spec("first-high").with_priority(5))
            .step(spec("second-high").with_priority(5))
            .step(spec("default")),
    );

    let pass = plan(&mut wf, 10);
    assert_eq!(pass.ready, vec!["first-high", "second-high", "low", "default"]);

    let pass = plan(&mut wf, 2);
    assert_eq!(pass.ready, vec!["first-high", "second-high"]);
}

#[test]
fn test_zero_capacity_still_cascades() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b").depends_on(["a"])),
    );
    set_status(&mut wf, "a", StepStatus::Failed);

    let pass = plan(&mut wf, 0);
    assert!(pass.ready.is_empty());
    assert_eq!(pass.skipped.len(), 1);
    assert_eq!(wf.step("b").unwrap().status, StepStatus::Skipped);
}

#[test]
fn test_failure_cascades_transitively() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b").depends_on(["a"]))
            .step(spec("c").depends_on(["b"]))
            .step(spec("d")),
    );
    set_status(&mut wf, "a", StepStatus::Failed);

    let skipped = cascade_skips(&mut wf);
    let ids: Vec<&str> = skipped.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert!(skipped[0].1.contains("'a'"));
    assert!(skipped[1].1.contains("'b'"));

    let c = wf.step("c").unwrap();
    assert_eq!(c.last_error.as_ref().unwrap().kind, StepErrorKind::UpstreamFailed);
    assert_eq!(wf.step("d").unwrap().status, StepStatus::Pending);
}

#[test]
fn test_deliberate_skip_satisfies_dependents() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b").depends_on(["a"])),
    );
    set_status(&mut wf, "a", StepStatus::Skipped);

    let pass = plan(&mut wf, 10);
    assert!(pass.skipped.is_empty());
    assert_eq!(pass.ready, vec!["b"]);
}

#[test]
fn test_backing_off_step_not_ready() {
    let mut wf = workflow(WorkflowRequest::new("u").step(spec("a")));
    wf.step_mut("a").unwrap().next_attempt_at = Some(Utc::now());

    assert!(ready_steps(&wf, 10).is_empty());

    wf.step_mut("a").unwrap().next_attempt_at = None;
    assert_eq!(ready_steps(&wf, 10), vec!["a"]);
}

#[test]
fn test_skip_pending_leaves_settled_steps() {
    let mut wf = workflow(
        WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b"))
            .step(spec("c")),
    );
    set_status(&mut wf, "a", StepStatus::Completed);
    set_status(&mut wf, "b", StepStatus::Running);

    let skipped = skip_pending(&mut wf, &StepError::cancelled("workflow cancelled"));
    assert_eq!(skipped, vec!["c"]);
    assert_eq!(wf.step("a").unwrap().status, StepStatus::Completed);
    assert_eq!(wf.step("b").unwrap().status, StepStatus::Running);
    assert!(wf.step("c").unwrap().is_skipped_by_failure());
}
