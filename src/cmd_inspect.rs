//! Stored workflow inspection commands.

use omniflow_config::Config;
use omniflow_protocols::{WorkflowFilter, WorkflowStatus};
use omniflow_store::open_store;

use crate::cli::OutputFormat;
use crate::cmd_run::print_workflow;

pub(crate) async fn handle_list(
    config: &Config,
    owner: Option<String>,
    status: Option<String>,
    offset: usize,
    limit: usize,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = build_filter(owner, status.as_deref(), offset, limit)?;
    let store = open_store(&config.store).await?;
    let page = store.find_by_filter(&filter).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No workflows found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<16} {:<10} {:<6} {}",
        "ID", "OWNER", "STATUS", "STEPS", "CREATED"
    );
    println!("{}", "-".repeat(96));
    for wf in &page.items {
        println!(
            "{:<38} {:<16} {:<10} {:<6} {}",
            wf.id,
            wf.owner_id,
            wf.status.to_string(),
            wf.steps.len(),
            wf.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    println!(
        "Showing {}-{} of {}",
        page.offset + 1,
        page.offset + page.items.len(),
        page.total
    );
    if page.has_more() {
        println!("Use --offset {} for more.", page.offset + page.items.len());
    }
    Ok(())
}

pub(crate) async fn handle_show(
    config: &Config,
    id: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config.store).await?;
    let workflow = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| format!("workflow not found: {}", id))?;
    print_workflow(&workflow, format)
}

fn build_filter(
    owner: Option<String>,
    status: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<WorkflowFilter, String> {
    let mut filter = WorkflowFilter::new().page(offset, limit);
    if let Some(owner) = owner {
        filter = filter.owner(owner);
    }
    if let Some(status) = status {
        filter = filter.status(status.parse::<WorkflowStatus>()?);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        let filter = build_filter(Some("user-1".into()), Some("Canceled"), 10, 5).unwrap();
        assert_eq!(filter.owner_id.as_deref(), Some("user-1"));
        assert_eq!(filter.status, Some(WorkflowStatus::Cancelled));
        assert_eq!(filter.offset, 10);
        assert_eq!(filter.limit, 5);
    }

    #[test]
    fn test_build_filter_rejects_unknown_status() {
        let err = build_filter(None, Some("sleeping"), 0, 20).unwrap_err();
        assert!(err.contains("sleeping"));
    }
}
