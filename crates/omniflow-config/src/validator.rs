//! Configuration validation.

use crate::schema::{Config, StoreBackend};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_scheduler(config, &mut result);
        Self::validate_retry(config, &mut result);
        Self::validate_events(config, &mut result);
        Self::validate_store(config, &mut result);

        result
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if config.scheduler.max_concurrent_steps == 0 {
            result.add_error(ValidationError::new(
                "scheduler.max_concurrent_steps",
                "max_concurrent_steps must be greater than 0",
            ));
        }
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        let retry = &config.retry;

        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "retry.backoff_multiplier",
                "backoff_multiplier must be at least 1.0 so delays never shrink",
            ));
        }

        if retry.base_delay_ms > retry.max_delay_ms {
            result.add_error(ValidationError::new(
                "retry.base_delay_ms",
                "base_delay_ms cannot exceed max_delay_ms",
            ));
        }

        if retry.step_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "retry.step_timeout_ms",
                "step_timeout_ms must be greater than 0",
            ));
        }

        if retry.max_retries > 20 {
            result.add_warning(ValidationWarning::new(
                "retry.max_retries",
                "max_retries is very high (>20), failing steps will hold workflows open for a long time",
            ));
        }

        if retry.max_retries > 0 && retry.base_delay_ms > 0 && !retry.jitter {
            result.add_warning(ValidationWarning::new(
                "retry.jitter",
                "jitter is disabled, concurrent retries against the same agent will be synchronized",
            ));
        }
    }

    fn validate_events(config: &Config, result: &mut ValidationResult) {
        if config.events.channel_capacity == 0 {
            result.add_error(ValidationError::new(
                "events.channel_capacity",
                "channel_capacity must be greater than 0",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.backend == StoreBackend::File && config.store.path.is_none() {
            result.add_warning(ValidationWarning::new(
                "store.path",
                "file backend without a path, defaulting to ~/.omniflow/workflows",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
