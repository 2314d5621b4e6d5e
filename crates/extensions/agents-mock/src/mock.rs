//! Canned-response agents.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use omniflow_protocols::{Agent, AgentContext, AgentError, StepInput, StepKind, StepOutput};

/// Registry name used for the mock agent of each kind.
pub fn default_agent_name(kind: StepKind) -> &'static str {
    match kind {
        StepKind::LanguageUnderstanding => "nlp",
        StepKind::Search => "search",
        StepKind::Call => "caller",
        StepKind::Booking => "booking",
        StepKind::Notification => "notifier",
        StepKind::Decision => "decision",
    }
}

/// Agent returning canned data for one step kind.
pub struct MockAgent {
    name: String,
    kind: StepKind,
    latency: Duration,
}

impl MockAgent {
    pub fn new(kind: StepKind) -> Self {
        Self::named(default_agent_name(kind), kind)
    }

    pub fn named(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            latency: Duration::ZERO,
        }
    }

    /// Simulated processing time per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> Option<StepKind> {
        Some(self.kind)
    }

    async fn execute(&self, input: StepInput, ctx: AgentContext) -> Result<StepOutput, AgentError> {
        debug!("[mock] {} handling step {}", self.name, input.step_id);

        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = ctx.cancel.cancelled() => return Err(AgentError::Cancelled),
            }
        }

        match self.kind {
            StepKind::LanguageUnderstanding => Ok(understand(&input)),
            StepKind::Search => Ok(search(&input)),
            StepKind::Call => call(&input),
            StepKind::Booking => Ok(book(&input)),
            StepKind::Notification => Ok(notify(&input)),
            StepKind::Decision => Ok(decide(&input)),
        }
    }
}

fn understand(input: &StepInput) -> StepOutput {
    let text = input
        .field("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();

    let intent = if ["book", "reserv", "table"].iter().any(|k| text.contains(k)) {
        "booking"
    } else if ["schedule", "meeting", "appointment"].iter().any(|k| text.contains(k)) {
        "scheduling"
    } else if ["flight", "hotel", "trip"].iter().any(|k| text.contains(k)) {
        "travel"
    } else {
        "general"
    };
    let confidence = if intent == "general" { 0.6 } else { 0.92 };

    StepOutput::new(json!({
        "intent": intent,
        "text": text,
        "entities": input.field("entities").cloned().unwrap_or(Value::Null),
    }))
    .with_confidence(confidence)
}

fn search(input: &StepInput) -> StepOutput {
    let query = input
        .field("query")
        .and_then(Value::as_str)
        .unwrap_or("restaurant");

    StepOutput::new(json!({
        "query": query,
        "results": [
            { "name": "Spice Garden Restaurant", "phone": "9548999129", "rating": 4.6 },
            { "name": "Mock Bistro", "phone": "+1-555-0100", "rating": 4.1 },
        ],
    }))
    .with_message(format!("Found 2 mock results for '{}'", query))
    .with_confidence(0.85)
}

/// Accepts 7 to 15 digits with common separators.
fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (7..=15).contains(&digits)
}

fn call(input: &StepInput) -> Result<StepOutput, AgentError> {
    let phone = input.field("phone").and_then(Value::as_str);
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(AgentError::InvalidInput(format!("invalid phone number: {}", phone)));
        }
    }

    let now = Utc::now();
    Ok(StepOutput::new(json!({
        "id": format!("mock_call_{}", now.timestamp()),
        "status": "mock_completed",
        "phone_number": phone,
        "summary": "Mock reservation confirmed successfully.",
        "duration": 45,
        "transcript": "Mock conversation transcript",
    }))
    .with_message("Mock reservation confirmed successfully.")
    .with_confidence(0.9))
}

fn book(input: &StepInput) -> StepOutput {
    let now = Utc::now();
    StepOutput::new(json!({
        "success": true,
        "reservation_confirmed": true,
        "reservation_id": format!("mock_res_{}", now.timestamp()),
        "details": input.payload.clone(),
        "test_mode": true,
        "timestamp": now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    }))
    .with_confidence(0.95)
}

fn notify(input: &StepInput) -> StepOutput {
    let channel = input
        .field("channel")
        .and_then(Value::as_str)
        .unwrap_or("in_app");
    StepOutput::new(json!({ "delivered": true, "channel": channel }))
}

fn decide(input: &StepInput) -> StepOutput {
    let mut based_on: Vec<&String> = input.upstream.keys().collect();
    based_on.sort();

    StepOutput::new(json!({
        "decision": "confirm",
        "based_on": based_on,
    }))
    .with_message(format!(
        "Plan completed after reviewing {} upstream result(s)",
        based_on.len()
    ))
    .with_confidence(0.88)
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
