//! Tests for configuration loading and validation

use atelier_core::config::{load_from_yaml, ConfigError, ConfigValidator, DegradedResponseMode};
use atelier_core::providers::ProviderKind;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

const VALID_YAML: &str = r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
    timeout_ms: 20000
  - name: gemini
    type: gemini
    api_key: g-test
    base_url: https://generativelanguage.googleapis.com/v1beta
    model: gemini-2.0-flash
    priority: 2
  - name: replicate
    type: replicate
    api_key: r8-test
    base_url: https://api.replicate.com/v1
    model: stability-ai/stable-diffusion-3.5-medium
    priority: 3
    poll:
      interval_ms: 1000
      max_attempts: 30
orchestrator:
  request_deadline_ms: 90000
  degraded_response: error
"#;

#[test]
fn test_load_valid_yaml() {
    let file = write_config(VALID_YAML);
    let config = load_from_yaml(file.path()).expect("valid config");

    assert_eq!(config.version, "0.1");
    assert_eq!(config.providers.len(), 3);
    assert_eq!(
        config.orchestrator.degraded_response,
        DegradedResponseMode::Error
    );

    let chain = config.chain_descriptors();
    let names: Vec<&str> = chain.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["openai", "gemini", "replicate"]);
    assert_eq!(chain[2].kind, ProviderKind::Replicate);
}

#[test]
fn test_env_var_interpolation() {
    std::env::set_var("ATELIER_TEST_OPENAI_KEY", "sk-from-env");
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: ${ATELIER_TEST_OPENAI_KEY}
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
"#,
    );

    let config = load_from_yaml(file.path()).expect("valid config");
    assert_eq!(config.providers[0].api_key.expose_secret(), "sk-from-env");
}

#[test]
fn test_missing_env_var_is_an_error() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: ${ATELIER_TEST_NO_SUCH_VAR}
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
"#,
    );

    match load_from_yaml(file.path()) {
        Err(ConfigError::EnvVarNotFound { var }) => {
            assert_eq!(var, "ATELIER_TEST_NO_SUCH_VAR");
        }
        other => panic!("expected missing env var error, got {other:?}"),
    }
}

#[test]
fn test_unknown_field_rejected() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
    retries: 3
"#,
    );

    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::ParseError { .. })
    ));
}

#[test]
fn test_duplicate_names_rejected() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
  - name: openai
    type: gemini
    api_key: g-test
    base_url: https://generativelanguage.googleapis.com/v1beta
    model: gemini-2.0-flash
    priority: 2
"#,
    );

    let error = load_from_yaml(file.path()).unwrap_err();
    assert!(error.to_string().contains("duplicate"));
}

#[test]
fn test_duplicate_priorities_rejected_for_enabled_providers() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
  - name: gemini
    type: gemini
    api_key: g-test
    base_url: https://generativelanguage.googleapis.com/v1beta
    model: gemini-2.0-flash
    priority: 1
"#,
    );

    let error = load_from_yaml(file.path()).unwrap_err();
    assert!(error.to_string().contains("priority"));
}

#[test]
fn test_disabled_provider_may_share_a_priority() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
  - name: gemini
    type: gemini
    api_key: g-test
    base_url: https://generativelanguage.googleapis.com/v1beta
    model: gemini-2.0-flash
    priority: 1
    enabled: false
"#,
    );

    let config = load_from_yaml(file.path()).expect("valid config");
    assert_eq!(config.chain_descriptors().len(), 1);
}

#[test]
fn test_all_disabled_rejected() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: sk-test
    base_url: https://api.openai.com/v1
    model: gpt-image-1
    priority: 1
    enabled: false
"#,
    );

    let error = load_from_yaml(file.path()).unwrap_err();
    assert!(error.to_string().contains("enabled"));
}

#[test]
fn test_deferred_provider_requires_poll_settings() {
    let file = write_config(
        r#"
version: "0.1"
providers:
  - name: replicate
    type: replicate
    api_key: r8-test
    base_url: https://api.replicate.com/v1
    model: some/model
    priority: 1
"#,
    );

    let error = load_from_yaml(file.path()).unwrap_err();
    assert!(error.to_string().contains("poll"));
}

#[test]
fn test_api_keys_never_appear_in_debug_output() {
    let file = write_config(VALID_YAML);
    let config = load_from_yaml(file.path()).expect("valid config");

    let debugged = format!("{config:?}");
    assert!(!debugged.contains("sk-test"));
    assert!(!debugged.contains("r8-test"));
    assert!(debugged.contains("[REDACTED]"));

    // Validation re-runs cleanly on an already loaded config.
    assert!(ConfigValidator::new().validate(&config).is_ok());
}
