use super::*;

fn input(kind: StepKind, payload: Value) -> StepInput {
    StepInput::new("wf-1", "step-1", kind, payload)
}

#[tokio::test]
async fn test_understanding_detects_intent() {
    let agent = MockAgent::new(StepKind::LanguageUnderstanding);
    assert_eq!(agent.name(), "nlp");

    let output = agent
        .execute(
            input(StepKind::LanguageUnderstanding, json!({"text": "Book a table for 4"})),
            AgentContext::new("u"),
        )
        .await
        .unwrap();
    assert_eq!(output.data["intent"], "booking");
    assert_eq!(output.confidence, Some(0.92));

    let output = agent
        .execute(
            input(StepKind::LanguageUnderstanding, json!({"text": "hello"})),
            AgentContext::new("u"),
        )
        .await
        .unwrap();
    assert_eq!(output.data["intent"], "general");
}

#[tokio::test]
async fn test_call_returns_mock_completed() {
    let agent = MockAgent::new(StepKind::Call);
    let output = agent
        .execute(
            input(StepKind::Call, json!({"phone": "9548999129"})),
            AgentContext::new("u"),
        )
        .await
        .unwrap();

    assert_eq!(output.data["status"], "mock_completed");
    assert!(output.data["id"].as_str().unwrap().starts_with("mock_call_"));
    assert_eq!(
        output.message.as_deref(),
        Some("Mock reservation confirmed successfully.")
    );
}

#[tokio::test]
async fn test_call_rejects_invalid_phone() {
    let agent = MockAgent::new(StepKind::Call);
    let err = agent
        .execute(
            input(StepKind::Call, json!({"phone": "call-me-maybe"})),
            AgentContext::new("u"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::InvalidInput(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_decision_summarizes_upstream() {
    let agent = MockAgent::new(StepKind::Decision);
    let step_input = input(StepKind::Decision, Value::Null)
        .with_upstream("search", json!({}))
        .with_upstream("call", json!({}));

    let output = agent.execute(step_input, AgentContext::new("u")).await.unwrap();
    assert_eq!(output.data["decision"], "confirm");
    assert_eq!(output.data["based_on"], json!(["call", "search"]));
    assert!(output.message.unwrap().contains('2'));
}

#[tokio::test(start_paused = true)]
async fn test_latency_observes_cancel() {
    let agent = MockAgent::new(StepKind::Booking).with_latency(Duration::from_secs(30));
    let ctx = AgentContext::new("u");
    let cancel = ctx.cancel.clone();

    let handle = tokio::spawn(async move {
        agent.execute(input(StepKind::Booking, Value::Null), ctx).await
    });
    cancel.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(AgentError::Cancelled)));
}

#[test]
fn test_phone_validation() {
    assert!(is_valid_phone("+1 (555) 010-0100"));
    assert!(is_valid_phone("9548999129"));
    assert!(!is_valid_phone("12345"));
    assert!(!is_valid_phone("555-CALL-NOW"));
}
