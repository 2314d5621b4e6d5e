//! Single step attempt execution.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use omniflow_config::CancellationMode;
use omniflow_protocols::{Agent, AgentContext, AgentError, StepInput, StepOutput};

/// Run one attempt of a step under a timeout.
///
/// An attempt that does not settle in time fails with a retryable
/// [`AgentError::Timeout`]. In [`CancellationMode::Abandon`] the attempt is
/// dropped as soon as the workflow is cancelled; otherwise the agent is left
/// to observe `ctx.cancel` itself.
pub async fn execute_attempt(
    agent: Arc<dyn Agent>,
    input: StepInput,
    ctx: AgentContext,
    timeout: Duration,
    mode: CancellationMode,
) -> Result<StepOutput, AgentError> {
    let cancel = ctx.cancel.clone();
    let step_id = input.step_id.clone();
    let attempt = tokio::time::timeout(timeout, agent.execute(input, ctx));

    let result = match mode {
        CancellationMode::Cooperative => attempt.await,
        CancellationMode::Abandon => tokio::select! {
            result = attempt => result,
            _ = cancel.cancelled() => {
                debug!("Abandoning step {} after cancellation", step_id);
                return Err(AgentError::Cancelled);
            }
        },
    };

    result.unwrap_or_else(|_| Err(AgentError::Timeout(timeout.as_millis() as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniflow_agents_mock::ScriptedAgent;
    use omniflow_protocols::StepKind;

    fn input() -> StepInput {
        StepInput::new("wf", "slow", StepKind::Call, serde_json::Value::Null)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retryable() {
        let agent = Arc::new(
            ScriptedAgent::succeeding("slow")
                .with_delay(Duration::from_secs(10))
                .ignoring_cancel(),
        );

        let err = execute_attempt(
            agent,
            input(),
            AgentContext::new("u"),
            Duration::from_millis(200),
            CancellationMode::Cooperative,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::Timeout(200)));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_returns_on_cancel() {
        let agent = Arc::new(
            ScriptedAgent::succeeding("stubborn")
                .with_delay(Duration::from_secs(10))
                .ignoring_cancel(),
        );
        let ctx = AgentContext::new("u");
        ctx.cancel.cancel();

        let err = execute_attempt(
            agent,
            input(),
            ctx,
            Duration::from_secs(60),
            CancellationMode::Abandon,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let agent = Arc::new(ScriptedAgent::succeeding("fast"));
        let output = execute_attempt(
            agent,
            input(),
            AgentContext::new("u"),
            Duration::from_secs(1),
            CancellationMode::Cooperative,
        )
        .await
        .unwrap();
        assert_eq!(output.data["agent"], "fast");
    }
}
