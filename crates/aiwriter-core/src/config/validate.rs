//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "completion.model must not be empty".into(),
            ));
        }
        if self.completion.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_output_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::ValidationError(
                "completion.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.limits.completion_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.completion_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.image_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.image_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.stock_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.stock_timeout_ms must be > 0".into(),
            ));
        }
        if self.dispatch.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.timeout_ms must be > 0".into(),
            ));
        }
        if !self.dispatch.route.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "dispatch.route must start with '/'".into(),
            ));
        }
        Ok(())
    }
}
