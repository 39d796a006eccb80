//! Configuration validation utilities

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::AtelierConfig;
use std::collections::HashSet;

/// Configuration validator with cross-field rules
///
/// Per-field rules live on the schema types; this layer checks the
/// relationships between descriptors that make the fallback chain
/// well-defined.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &AtelierConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_enabled_providers(config)?;
        self.validate_unique_names(config)?;
        self.validate_unique_priorities(config)?;

        Ok(())
    }

    /// At least one provider must be enabled
    fn validate_enabled_providers(&self, config: &AtelierConfig) -> Result<(), ValidationError> {
        let enabled_count = config.providers.iter().filter(|p| p.enabled).count();
        if enabled_count == 0 {
            return Err(ValidationError::new(
                "providers",
                ValidationErrorKind::Custom {
                    message: "at least one provider must be enabled".to_string(),
                },
            ));
        }
        Ok(())
    }

    /// Provider names must be unique (they key the attempt history)
    fn validate_unique_names(&self, config: &AtelierConfig) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (i, provider) in config.providers.iter().enumerate() {
            if !seen.insert(provider.name.as_str()) {
                return Err(ValidationError::duplicate(
                    format!("providers[{i}].name"),
                    provider.name.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Priorities of enabled providers must be unique; ties would make
    /// the chain order ambiguous
    fn validate_unique_priorities(&self, config: &AtelierConfig) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (i, provider) in config.providers.iter().enumerate() {
            if provider.enabled && !seen.insert(provider.priority) {
                return Err(ValidationError::duplicate(
                    format!("providers[{i}].priority"),
                    provider.priority.to_string(),
                )
                .with_context("enabled providers need distinct priorities"));
            }
        }
        Ok(())
    }
}
