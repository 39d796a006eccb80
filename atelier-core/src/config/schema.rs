//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::protocol::ProtocolKind;
use crate::providers::adapter::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure for atelier
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtelierConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Ordered list of generation backends
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,

    /// Orchestrator-level settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Global connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Custom metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// One configured generation backend
///
/// Read-only at request time; the fallback chain is assembled from the
/// enabled descriptors in ascending priority order at process start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderDescriptor {
    /// Unique provider name
    pub name: String,

    /// Backend kind (openai, gemini, replicate)
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Base URL for the provider API
    pub base_url: String,

    /// Model identifier to request from the backend
    pub model: String,

    /// Priority rank; lower tries first
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Per-call timeout covering submit and, for deferred backends,
    /// the whole polling loop
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Polling settings; required for deferred backends
    #[serde(default)]
    pub poll: Option<PollConfig>,

    /// Optional cap on concurrent in-flight submits to this backend
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Whether this provider is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderDescriptor {
    /// The protocol this backend speaks
    pub fn protocol(&self) -> ProtocolKind {
        self.kind.protocol()
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate this descriptor's own fields
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{path}.name")));
        }
        if self.model.is_empty() {
            return Err(ValidationError::required(format!("{path}.model")));
        }
        if self.timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{path}.timeout_ms"),
                "timeout must be positive",
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ValidationError::new(
                format!("{path}.base_url"),
                ValidationErrorKind::InvalidUrl {
                    message: self.base_url.clone(),
                },
            ));
        }
        if let Some(max) = self.max_concurrent {
            if max == 0 {
                return Err(ValidationError::out_of_range(
                    format!("{path}.max_concurrent"),
                    "concurrency cap must be positive",
                ));
            }
        }

        match (self.protocol(), &self.poll) {
            (ProtocolKind::Deferred, None) => {
                Err(ValidationError::required(format!("{path}.poll"))
                    .with_context("deferred backends need poll interval and attempt budget"))
            }
            (ProtocolKind::Immediate, Some(_)) => Err(ValidationError::new(
                format!("{path}.poll"),
                ValidationErrorKind::Custom {
                    message: "immediate backends take no polling settings".to_string(),
                },
            )),
            (ProtocolKind::Deferred, Some(poll)) => poll.validate(&format!("{path}.poll")),
            (ProtocolKind::Immediate, None) => Ok(()),
        }
    }
}

/// Polling settings for a deferred backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Delay between status polls (milliseconds)
    pub interval_ms: u64,

    /// Maximum number of polls before the attempt times out
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.interval_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{path}.interval_ms"),
                "poll interval must be positive",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                format!("{path}.max_attempts"),
                "poll budget must be positive",
            ));
        }
        Ok(())
    }
}

/// Orchestrator-level settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Overall request deadline; when it elapses the current attempt
    /// closes as timeout and remaining providers are skipped
    #[serde(default)]
    pub request_deadline_ms: Option<u64>,

    /// How the external HTTP layer should surface degraded results
    #[serde(default)]
    pub degraded_response: DegradedResponseMode,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_deadline_ms: None,
            degraded_response: DegradedResponseMode::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }
}

/// Caller-facing policy for degraded results
///
/// The orchestrator always returns a result; whether the HTTP layer
/// maps a degraded one to 200-with-flag or an error status is product
/// policy, carried here and never interpreted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedResponseMode {
    /// Serve the placeholder with a degraded flag
    OkWithFlag,
    /// Report the exhaustion as an error status
    Error,
}

impl Default for DegradedResponseMode {
    fn default() -> Self {
        Self::OkWithFlag
    }
}

/// Global connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// TCP connect timeout (milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Connection pool size per host
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl AtelierConfig {
    /// Validate per-field rules; cross-field rules live in the validator
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }
        for (i, provider) in self.providers.iter().enumerate() {
            provider.validate(&format!("providers[{i}]"))?;
        }
        Ok(())
    }

    /// Enabled descriptors in ascending priority order
    pub fn chain_descriptors(&self) -> Vec<&ProviderDescriptor> {
        let mut descriptors: Vec<&ProviderDescriptor> =
            self.providers.iter().filter(|p| p.enabled).collect();
        descriptors.sort_by_key(|p| p.priority);
        descriptors
    }
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_pool_max_idle() -> usize {
    10
}
