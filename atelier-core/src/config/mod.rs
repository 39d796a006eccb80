//! Configuration module for atelier
//!
//! Defines the configuration schema for the generation orchestrator:
//! the ordered provider list, per-provider timeouts and poll budgets,
//! and the orchestrator-level deadline and degraded-response policy.
//! Supplied at process start; read-only at request time.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AtelierConfig, ConnectionConfig, DegradedResponseMode, OrchestratorConfig, PollConfig,
    ProviderDescriptor,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<AtelierConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let mut config: AtelierConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    // Additional interpolation for any remaining env vars
    env::interpolate_config_env_vars(&mut config)?;

    let validator = ConfigValidator::new();
    validator.validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<AtelierConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let mut config: AtelierConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    // Additional interpolation for any remaining env vars
    env::interpolate_config_env_vars(&mut config)?;

    let validator = ConfigValidator::new();
    validator.validate(&config)?;
    Ok(config)
}
