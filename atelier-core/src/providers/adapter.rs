//! Provider adapter trait and registry
//!
//! Each backend is wrapped in one adapter that hides whether the
//! service answers synchronously or hands back a task to poll.
//! Adapters never fall back to other providers and hold no state
//! across requests; credentials and endpoints are injected at
//! construction.

use crate::config::ProviderDescriptor;
use crate::http::HttpClient;
use crate::protocol::{GenerationRequest, ImageArtifact, ProtocolKind, TaskHandle};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a submit call produced
#[derive(Debug, Clone)]
pub enum Submission {
    /// The backend returned the final image synchronously
    Complete(ImageArtifact),
    /// The backend accepted a task; the result must be polled
    Deferred(TaskHandle),
}

/// Status of a deferred task at one poll
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The task has not resolved yet
    Pending,
    /// The task produced an image
    Succeeded(ImageArtifact),
    /// The task failed for good
    Failed(String),
}

/// Uniform contract over one generation backend
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider's name
    fn name(&self) -> &str;

    /// Whether the provider answers immediately or via a task
    fn protocol(&self) -> ProtocolKind;

    /// Submit one generation request
    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<Submission>;

    /// Query the status of a deferred task
    ///
    /// Must be idempotent and side-effect-free beyond reading status.
    /// Immediate providers keep the default, which rejects the call.
    async fn poll(&self, handle: &TaskHandle) -> ProviderResult<PollOutcome> {
        let _ = handle;
        Err(ProviderError::Rejected(format!(
            "provider '{}' does not expose a task protocol",
            self.name()
        )))
    }
}

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Replicate,
}

impl ProviderKind {
    /// The protocol this backend speaks
    pub fn protocol(&self) -> ProtocolKind {
        match self {
            ProviderKind::OpenAi | ProviderKind::Gemini => ProtocolKind::Immediate,
            ProviderKind::Replicate => ProtocolKind::Deferred,
        }
    }

    /// Construct the adapter for a configured backend
    pub fn build(
        &self,
        descriptor: &ProviderDescriptor,
        http: HttpClient,
    ) -> Arc<dyn ProviderAdapter> {
        match self {
            ProviderKind::OpenAi => {
                Arc::new(crate::providers::OpenAiAdapter::new(descriptor, http))
            }
            ProviderKind::Gemini => {
                Arc::new(crate::providers::GeminiAdapter::new(descriptor, http))
            }
            ProviderKind::Replicate => {
                Arc::new(crate::providers::ReplicateAdapter::new(descriptor, http))
            }
        }
    }
}
