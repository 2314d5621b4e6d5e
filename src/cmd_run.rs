//! Plan commands: run, validate, schema.

use std::path::Path;
use std::time::Duration;

use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use omniflow_config::Config;
use omniflow_engine::{Orchestrator, topological_order, validate_request};
use omniflow_protocols::{Workflow, WorkflowEvent, WorkflowEventKind, WorkflowRequest};
use omniflow_store::open_store;

use crate::cli::OutputFormat;
use crate::register;

pub(crate) struct RunOptions {
    pub owner: Option<String>,
    pub timeout: Option<u64>,
    pub quiet: bool,
    pub format: OutputFormat,
}

/// Read a plan file. `.yaml` and `.yml` are parsed as YAML, everything else as JSON.
pub(crate) fn load_plan(path: &Path) -> Result<WorkflowRequest, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read plan {}: {}", path.display(), e))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let request = if is_yaml {
        serde_yml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(request)
}

pub(crate) async fn handle_run(
    config: Config,
    plan: &Path,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = load_plan(plan)?;
    if let Some(owner) = options.owner {
        request.owner_id = owner;
    }

    let registry = register::build_registry();
    register::missing_agents(&registry, &request);

    let store = open_store(&config.store).await?;
    let orchestrator = Orchestrator::new(config, registry, store);

    let events = orchestrator.subscribe();
    let workflow = orchestrator.create_workflow(request).await?;
    let id = workflow.id.clone();

    let printer = (!options.quiet).then(|| {
        let id = id.clone();
        let format = options.format;
        tokio::spawn(async move {
            let mut stream = BroadcastStream::new(events);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(event) => {
                        print_event(&event, format);
                        if event.workflow_id == id && event.is_terminal() {
                            break;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("Event stream lagged, {} events dropped", n);
                    }
                }
            }
        })
    });

    orchestrator.start(&id).await?;

    let finished = match options.timeout {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), orchestrator.wait(&id)).await {
            Ok(done) => done?,
            Err(_) => {
                warn!("Workflow {} still running after {}s, cancelling", id, secs);
                orchestrator.cancel(&id).await?
            }
        },
        None => orchestrator.wait(&id).await?,
    };

    if let Some(printer) = printer {
        // The terminal event may have been dropped on lag.
        if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
            warn!("Event printer did not see the final event");
        }
    }

    info!("Workflow {} finished as {}", finished.id, finished.status);
    print_workflow(&finished, options.format)?;
    Ok(())
}

pub(crate) fn handle_validate(plan: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let request = load_plan(plan)?;
    validate_request(&request)?;
    let order = topological_order(&request.steps)?;

    println!("Plan is valid: {} steps", request.steps.len());
    if !order.is_empty() {
        println!("Dependency order: {}", order.join(" -> "));
    }
    Ok(())
}

pub(crate) fn handle_schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(WorkflowRequest);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn print_event(event: &WorkflowEvent, format: OutputFormat) {
    if format == OutputFormat::Json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Cannot encode event: {}", e),
        }
        return;
    }

    let detail = match &event.kind {
        WorkflowEventKind::WorkflowCreated { step_count, .. } => format!("{} steps", step_count),
        WorkflowEventKind::StepStarted { step_id, agent, attempt } => {
            format!("{} via {} (attempt {})", step_id, agent, attempt)
        }
        WorkflowEventKind::StepCompleted { step_id, .. } => step_id.clone(),
        WorkflowEventKind::StepFailed {
            step_id,
            error,
            will_retry,
            ..
        } => {
            let next = if *will_retry { "retrying" } else { "giving up" };
            format!("{}: {} ({})", step_id, error, next)
        }
        WorkflowEventKind::StepSkipped { step_id, reason } => format!("{}: {}", step_id, reason),
        WorkflowEventKind::WorkflowCompleted { result } => result.message.clone(),
        WorkflowEventKind::WorkflowFailed { error, .. } => error.clone(),
        _ => String::new(),
    };

    println!(
        "{} {:<20} {}",
        event.timestamp.format("%H:%M:%S%.3f"),
        event.event_type(),
        detail
    );
}

/// Print a workflow snapshot with its per-step table.
pub(crate) fn print_workflow(
    workflow: &Workflow,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(workflow)?);
        return Ok(());
    }

    println!();
    println!("Workflow {} ({})", workflow.id, workflow.status);
    println!("  Owner: {}", workflow.owner_id);
    if let Some(result) = &workflow.result {
        println!("  Success: {}", result.success);
        println!("  Confidence: {:.2}", result.confidence);
        println!("  Message: {}", result.message);
        if let Some(error) = &result.error {
            println!("  Error: {}", error);
        }
    }
    if let Some(ms) = workflow.actual_duration_ms {
        println!("  Duration: {}ms", ms);
    }

    println!();
    println!("{:<20} {:<12} {:<10} {:<8} {}", "STEP", "KIND", "STATUS", "RETRIES", "ERROR");
    println!("{}", "-".repeat(72));
    for step in &workflow.steps {
        let error = step
            .last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        println!(
            "{:<20} {:<12} {:<10} {:<8} {}",
            step.id,
            step.kind.to_string(),
            step.status.to_string(),
            step.retry_count,
            error
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use omniflow_config::RetryConfig;
    use omniflow_protocols::{StepKind, WorkflowStatus};
    use omniflow_store::MemoryWorkflowStore;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_plan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.yml");
        std::fs::write(
            &path,
            r#"
owner_id: user-1
steps:
  - id: find
    kind: search
    agent: search
  - id: book
    kind: booking
    agent: booking
    metadata:
      dependencies: [find]
      priority: 5
"#,
        )
        .unwrap();

        let request = load_plan(&path).unwrap();
        assert_eq!(request.owner_id, "user-1");
        assert_eq!(request.steps.len(), 2);
        assert_eq!(request.steps[1].kind, StepKind::Booking);
        assert_eq!(request.steps[1].metadata.dependencies, vec!["find".to_string()]);
        assert_eq!(request.steps[1].metadata.priority, 5);
    }

    #[test]
    fn test_load_json_plan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"owner_id": "user-2", "steps": [{"id": "a", "kind": "notification", "agent": "notifier"}]}"#,
        )
        .unwrap();

        let request = load_plan(&path).unwrap();
        assert_eq!(request.owner_id, "user-2");
        assert_eq!(request.steps[0].agent, "notifier");
    }

    #[test]
    fn test_load_missing_plan() {
        let dir = TempDir::new().unwrap();
        let err = load_plan(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read plan"));
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cycle.yaml");
        std::fs::write(
            &path,
            r#"
owner_id: user-1
steps:
  - id: a
    kind: search
    agent: search
    metadata: { dependencies: [b] }
  - id: b
    kind: search
    agent: search
    metadata: { dependencies: [a] }
"#,
        )
        .unwrap();

        assert!(handle_validate(&path).is_err());
    }

    #[tokio::test]
    async fn test_demo_plan_runs_to_completion() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/booking.yaml");
        let request = load_plan(&path).unwrap();
        assert!(handle_validate(&path).is_ok());

        let config = Config {
            retry: RetryConfig::immediate(0),
            ..Config::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            register::build_registry(),
            Arc::new(MemoryWorkflowStore::new()),
        );

        let wf = orchestrator.submit(request).await.unwrap();
        let done = orchestrator.wait(&wf.id).await.unwrap();

        assert_eq!(done.status, WorkflowStatus::Completed);
        let result = done.result.unwrap();
        assert!(result.success);
        assert_eq!(
            result.message,
            "Plan completed after reviewing 2 upstream result(s)"
        );
    }
}
