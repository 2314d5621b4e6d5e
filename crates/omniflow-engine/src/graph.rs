//! Step graph validation.
//!
//! A request is accepted only when every step id is unique and non-empty,
//! every step names an agent, every dependency refers to a declared step,
//! and the dependency relation is acyclic.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use omniflow_protocols::{StepSpec, WorkflowRequest};

use crate::error::{EngineError, EngineResult};

/// Validate the step graph of a request, reporting every problem found.
pub fn validate_request(request: &WorkflowRequest) -> EngineResult<()> {
    let mut errors = Vec::new();

    if request.owner_id.trim().is_empty() {
        errors.push("owner id is empty".to_string());
    }

    let mut seen = HashSet::new();
    for (index, step) in request.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            errors.push(format!("step #{} has an empty id", index));
            continue;
        }
        if !seen.insert(step.id.as_str()) {
            errors.push(format!("duplicate step id '{}'", step.id));
        }
        if step.agent.trim().is_empty() {
            errors.push(format!("step '{}' has no agent", step.id));
        }
    }

    for step in &request.steps {
        for dep in &step.metadata.dependencies {
            if dep == &step.id {
                errors.push(format!("step '{}' depends on itself", step.id));
            } else if !seen.contains(dep.as_str()) {
                errors.push(format!("step '{}' depends on unknown step '{}'", step.id, dep));
            }
        }
    }

    // Cycle detection is only meaningful once references resolve.
    if errors.is_empty() {
        if let Err(msg) = topological_order(&request.steps) {
            errors.push(msg);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::InvalidWorkflow(errors.join("; ")))
    }
}

/// Step ids in an order where every step follows its dependencies (Kahn's algorithm).
pub fn topological_order(steps: &[StepSpec]) -> Result<Vec<String>, String> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for step in steps {
        in_degree.entry(step.id.as_str()).or_insert(0);
    }

    for step in steps {
        let deps: BTreeSet<&str> = step.metadata.dependencies.iter().map(String::as_str).collect();
        for dep in deps {
            dependents.entry(dep).or_default().push(step.id.as_str());
            *in_degree.entry(step.id.as_str()).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&str> = steps
        .iter()
        .map(|s| s.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        if let Some(next) = dependents.get(id) {
            for &dependent in next {
                if let Some(d) = in_degree.get_mut(dependent) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }
    }

    if order.len() == steps.len() {
        Ok(order)
    } else {
        Err(format!(
            "cycle detected: resolved {} of {} steps",
            order.len(),
            steps.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniflow_protocols::StepKind;

    fn spec(id: &str) -> StepSpec {
        StepSpec::new(id, StepKind::Search, "search")
    }

    #[test]
    fn test_valid_chain() {
        let request = WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b").depends_on(["a"]))
            .step(spec("c").depends_on(["a", "b"]));

        assert!(validate_request(&request).is_ok());
        assert_eq!(topological_order(&request.steps).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_request_is_valid() {
        assert!(validate_request(&WorkflowRequest::new("u")).is_ok());
    }

    #[test]
    fn test_cycle_rejected() {
        let request = WorkflowRequest::new("u")
            .step(spec("a").depends_on(["b"]))
            .step(spec("b").depends_on(["a"]));

        let err = validate_request(&request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWorkflow(ref m) if m.contains("cycle")));
    }

    #[test]
    fn test_unknown_and_self_dependency() {
        let request = WorkflowRequest::new("u")
            .step(spec("a").depends_on(["a"]))
            .step(spec("b").depends_on(["ghost"]));

        let msg = validate_request(&request).unwrap_err().to_string();
        assert!(msg.contains("depends on itself"));
        assert!(msg.contains("unknown step 'ghost'"));
    }

    #[test]
    fn test_duplicate_ids_and_missing_agent() {
        let request = WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("a"))
            .step(StepSpec::new("c", StepKind::Call, " "));

        let msg = validate_request(&request).unwrap_err().to_string();
        assert!(msg.contains("duplicate step id 'a'"));
        assert!(msg.contains("step 'c' has no agent"));
    }

    #[test]
    fn test_repeated_dependency_counts_once() {
        let request = WorkflowRequest::new("u")
            .step(spec("a"))
            .step(spec("b").depends_on(["a", "a"]));

        assert_eq!(topological_order(&request.steps).unwrap(), vec!["a", "b"]);
    }
}
