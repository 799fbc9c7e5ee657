//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

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
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_auth(config, &mut result);
        Self::validate_render(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_storage(config, &mut result);

        Ok(result)
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }
        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_auth(config: &Config, result: &mut ValidationResult) {
        match &config.auth.token {
            Some(token) if token.is_empty() => {
                result.add_error(ValidationError::new("auth.token", "Token cannot be empty"));
            }
            Some(_) => {}
            None => {
                result.add_warning(ValidationWarning::new(
                    "auth.token",
                    "No token configured; the render endpoint accepts unauthenticated requests",
                ));
            }
        }
        if let Some(next) = &config.auth.next_token {
            if next.is_empty() {
                result.add_error(ValidationError::new(
                    "auth.next_token",
                    "Rotation token cannot be empty",
                ));
            }
        }
    }

    fn validate_render(config: &Config, result: &mut ValidationResult) {
        if config.render.concurrency == 0 {
            result.add_error(ValidationError::new(
                "render.concurrency",
                "Concurrency must be at least 1",
            ));
        }
        let stages = [
            ("render.timeouts.launch_ms", config.render.timeouts.launch_ms),
            (
                "render.timeouts.context_ms",
                config.render.timeouts.context_ms,
            ),
            (
                "render.timeouts.navigate_ms",
                config.render.timeouts.navigate_ms,
            ),
            ("render.timeouts.settle_ms", config.render.timeouts.settle_ms),
            (
                "render.timeouts.bot_check_ms",
                config.render.timeouts.bot_check_ms,
            ),
            (
                "render.timeouts.overlay_scan_ms",
                config.render.timeouts.overlay_scan_ms,
            ),
            (
                "render.timeouts.overlay_hide_ms",
                config.render.timeouts.overlay_hide_ms,
            ),
            ("render.timeouts.audit_ms", config.render.timeouts.audit_ms),
            (
                "render.timeouts.screenshot_ms",
                config.render.timeouts.screenshot_ms,
            ),
            (
                "render.timeouts.heatmap_ms",
                config.render.timeouts.heatmap_ms,
            ),
        ];
        for (path, ms) in stages {
            if ms == 0 {
                result.add_error(ValidationError::new(path, "Timeout cannot be 0"));
            } else if ms > 300_000 {
                result.add_warning(ValidationWarning::new(
                    path,
                    "Timeout above 5 minutes defeats the watchdog",
                ));
            }
        }
        if !(0.0..=100.0).contains(&config.render.overlay_area_pct)
            || config.render.overlay_area_pct == 0.0
        {
            result.add_error(ValidationError::new(
                "render.overlay_area_pct",
                "Must be within (0, 100]",
            ));
        }
        if !(0.0..=100.0).contains(&config.render.cta_cap_pct) || config.render.cta_cap_pct == 0.0 {
            result.add_error(ValidationError::new(
                "render.cta_cap_pct",
                "Must be within (0, 100]",
            ));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.db_path.is_empty() {
            result.add_error(ValidationError::new(
                "queue.db_path",
                "Database path cannot be empty",
            ));
        }
        if config.queue.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "queue.max_attempts",
                "Max attempts must be at least 1",
            ));
        }
        if config.queue.poll_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "queue.poll_interval_secs",
                "Poll interval of 0 hot-loops the worker",
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.endpoint.is_none() {
            result.add_warning(ValidationWarning::new(
                "storage.endpoint",
                "No object store configured; the worker cannot upload screenshots",
            ));
        }
        if config.storage.bucket.is_empty() {
            result.add_error(ValidationError::new(
                "storage.bucket",
                "Bucket cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
