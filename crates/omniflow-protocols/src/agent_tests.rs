use super::*;
use serde_json::json;

struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(&self, input: StepInput, ctx: AgentContext) -> Result<StepOutput, AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        Ok(StepOutput::new(input.payload).with_confidence(0.9))
    }
}

#[test]
fn test_step_input_fields() {
    let input = StepInput::new("wf", "s1", StepKind::Call, json!({"phone": "+15550100"}))
        .with_attempt(2)
        .with_upstream("search", json!({"venue": "Luigi's"}));

    assert_eq!(input.attempt, 2);
    assert_eq!(input.require_str("phone").unwrap(), "+15550100");
    assert!(matches!(input.require_str("email"), Err(AgentError::InvalidInput(_))));
    assert_eq!(input.upstream["search"]["venue"], "Luigi's");
}

#[tokio::test]
async fn test_agent_execute() {
    let agent = EchoAgent;
    assert_eq!(agent.name(), "echo");
    assert!(agent.kind().is_none());

    let input = StepInput::new("wf", "s1", StepKind::Search, json!({"q": "pizza"}));
    let output = agent.execute(input, AgentContext::new("user")).await.unwrap();
    assert_eq!(output.data["q"], "pizza");
    assert_eq!(output.confidence, Some(0.9));
}

#[tokio::test]
async fn test_agent_observes_cancel() {
    let ctx = AgentContext::new("user");
    ctx.cancel.cancel();

    let input = StepInput::new("wf", "s1", StepKind::Search, json!(null));
    let err = EchoAgent.execute(input, ctx).await.unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
}
