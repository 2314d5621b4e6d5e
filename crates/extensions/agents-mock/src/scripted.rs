//! Agents that replay a fixed script of outcomes.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use omniflow_protocols::{Agent, AgentContext, AgentError, StepInput, StepOutput};

/// Result of one scripted invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed(StepOutput),
    Retryable(String),
    Terminal(String),
}

impl Outcome {
    fn into_result(self) -> Result<StepOutput, AgentError> {
        match self {
            Self::Succeed(output) => Ok(output),
            Self::Retryable(message) => Err(AgentError::retryable(message)),
            Self::Terminal(message) => Err(AgentError::terminal(message)),
        }
    }
}

/// Replays queued outcomes in order, then repeats a fallback outcome.
pub struct ScriptedAgent {
    name: String,
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    delay: Duration,
    honor_cancel: bool,
    calls: AtomicU32,
    saw_cancel: AtomicBool,
    inputs: Mutex<Vec<StepInput>>,
}

impl ScriptedAgent {
    fn with_fallback(name: impl Into<String>, fallback: Outcome) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            honor_cancel: true,
            calls: AtomicU32::new(0),
            saw_cancel: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds with `{"agent": name}`.
    pub fn succeeding(name: impl Into<String>) -> Self {
        let name = name.into();
        let output = StepOutput::new(serde_json::json!({ "agent": name }));
        Self::with_fallback(name, Outcome::Succeed(output))
    }

    /// Always fails, retryably or terminally.
    pub fn failing(name: impl Into<String>, retryable: bool) -> Self {
        let name = name.into();
        let outcome = if retryable {
            Outcome::Retryable(format!("{} is unavailable", name))
        } else {
            Outcome::Terminal(format!("{} rejected the request", name))
        };
        Self::with_fallback(name, outcome)
    }

    /// Fails retryably `failures` times, then succeeds.
    pub fn fail_then_succeed(name: impl Into<String>, failures: u32) -> Self {
        let agent = Self::succeeding(name);
        for attempt in 1..=failures {
            agent
                .script
                .lock()
                .push_back(Outcome::Retryable(format!("transient failure #{}", attempt)));
        }
        agent
    }

    /// Queue an outcome ahead of the fallback.
    pub fn then(self, outcome: Outcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Replace the fallback with a success carrying `output`.
    pub fn with_output(mut self, output: StepOutput) -> Self {
        self.fallback = Outcome::Succeed(output);
        self
    }

    /// Wait before producing each outcome.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keep running through a cancellation signal.
    pub fn ignoring_cancel(mut self) -> Self {
        self.honor_cancel = false;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inputs received so far, in call order.
    pub fn inputs(&self) -> Vec<StepInput> {
        self.inputs.lock().clone()
    }

    /// Whether any invocation observed the cancellation signal.
    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: StepInput, ctx: AgentContext) -> Result<StepOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(input);

        if !self.delay.is_zero() {
            if self.honor_cancel {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = ctx.cancel.cancelled() => {
                        self.saw_cancel.store(true, Ordering::SeqCst);
                        return Err(AgentError::Cancelled);
                    }
                }
            } else {
                tokio::time::sleep(self.delay).await;
                if ctx.is_cancelled() {
                    self.saw_cancel.store(true, Ordering::SeqCst);
                }
            }
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone()).into_result()
    }
}

#[cfg(test)]
#[path = "scripted_tests.rs"]
mod tests;
