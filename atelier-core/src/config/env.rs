//! Environment variable expansion for configuration values
//!
//! Placeholders use the `${VAR_NAME}` form and may appear anywhere in
//! a raw config document or inside individual fields. Every missing
//! variable is reported, not just the first one encountered.

use super::error::ConfigError;
use super::schema::AtelierConfig;
use super::secrets::SecretString;
use regex::{Captures, Regex};
use std::env;

/// Matches `${VAR_NAME}` with an uppercase-and-underscore name
fn placeholder() -> Regex {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap()
}

/// Expand every `${VAR}` placeholder in `content`
///
/// Unset variables fail the whole expansion; the error names all of
/// them so a misconfigured deployment surfaces in one pass.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing: Vec<String> = Vec::new();

    let expanded = placeholder().replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        env::var(name).unwrap_or_else(|_| {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            String::new()
        })
    });

    if missing.is_empty() {
        Ok(expanded.into_owned())
    } else {
        Err(ConfigError::EnvVarNotFound {
            var: missing.join(", "),
        })
    }
}

/// Expand placeholders that survived document-level expansion
///
/// Values injected programmatically (rather than parsed from a file)
/// can still carry `${VAR}` references; API keys and base URLs are the
/// fields where that happens in practice.
pub fn interpolate_config_env_vars(config: &mut AtelierConfig) -> Result<(), ConfigError> {
    for provider in &mut config.providers {
        let api_key = interpolate_env_vars(provider.api_key.expose_secret())?;
        provider.api_key = SecretString::new(api_key);
        provider.base_url = interpolate_env_vars(&provider.base_url)?;
    }
    Ok(())
}
