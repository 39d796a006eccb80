//! Fallback chain orchestration
//!
//! The orchestrator drives one request through the configured provider
//! chain: `Idle -> Trying(provider_i) -> {Succeeded | Advancing} ->
//! Trying(provider_i+1) -> ... -> Exhausted -> FallbackResolved`.
//! Providers are tried strictly in ascending priority order, one at a
//! time, each under its own timeout and the overall request deadline.
//! Every provider tried closes exactly one Attempt; the orchestrator
//! itself never fails — exhaustion resolves to the fixed placeholder.

use crate::config::{AtelierConfig, OrchestratorConfig, ProviderDescriptor};
use crate::fallback::{FallbackArtifact, FallbackError};
use crate::http::HttpClient;
use crate::protocol::{
    Attempt, AttemptLog, AttemptOutcome, GenerationRequest, GenerationResult, ImageArtifact,
};
use crate::providers::adapter::{ProviderAdapter, Submission};
use crate::providers::error::ProviderError;
use crate::providers::poller::{PollResult, TaskPoller};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors constructing an orchestrator
///
/// Construction is the only fallible step; `generate` always returns
/// a result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("fallback artifact: {0}")]
    Fallback(#[from] FallbackError),

    #[error("http client: {0}")]
    Http(#[from] ProviderError),

    #[error("fallback chain has no providers")]
    EmptyChain,
}

/// One provider slot in the chain
struct ChainEntry {
    descriptor: ProviderDescriptor,
    adapter: Arc<dyn ProviderAdapter>,
    /// Optional per-provider concurrency cap; held across submit only,
    /// never across a polling sleep
    limiter: Option<Arc<Semaphore>>,
}

impl ChainEntry {
    fn new(descriptor: ProviderDescriptor, adapter: Arc<dyn ProviderAdapter>) -> Self {
        let limiter = descriptor
            .max_concurrent
            .map(|max| Arc::new(Semaphore::new(max)));
        Self {
            descriptor,
            adapter,
            limiter,
        }
    }
}

/// Priority-ordered list of provider adapters
pub struct FallbackChain {
    entries: Vec<ChainEntry>,
}

impl FallbackChain {
    /// Assemble the chain from configuration, building one adapter per
    /// enabled descriptor in ascending priority order
    pub fn from_config(config: &AtelierConfig) -> Result<Self, OrchestratorError> {
        let http = HttpClient::with_config(
            config.connection.connect_timeout(),
            config.connection.pool_max_idle_per_host,
        )?;

        let entries = config
            .chain_descriptors()
            .into_iter()
            .map(|descriptor| {
                let adapter = descriptor.kind.build(descriptor, http.clone());
                ChainEntry::new(descriptor.clone(), adapter)
            })
            .collect();

        Ok(Self { entries })
    }

    /// Start assembling a chain from explicit adapters (mainly tests)
    pub fn builder() -> FallbackChainBuilder {
        FallbackChainBuilder {
            entries: Vec::new(),
        }
    }

    /// Provider names in try order
    pub fn provider_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.descriptor.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for chains assembled from explicit adapters
pub struct FallbackChainBuilder {
    entries: Vec<ChainEntry>,
}

impl FallbackChainBuilder {
    /// Add a provider; chain order follows descriptor priority
    pub fn entry(
        mut self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        self.entries.push(ChainEntry::new(descriptor, adapter));
        self
    }

    pub fn build(mut self) -> FallbackChain {
        self.entries.sort_by_key(|e| e.descriptor.priority);
        FallbackChain {
            entries: self.entries,
        }
    }
}

/// Drives generation requests through the fallback chain
pub struct Orchestrator {
    chain: FallbackChain,
    config: OrchestratorConfig,
    fallback: FallbackArtifact,
}

impl Orchestrator {
    /// Create an orchestrator over an assembled chain
    ///
    /// Prepares and validates the fallback artifact; a chain with no
    /// providers is refused.
    pub fn new(chain: FallbackChain, config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        if chain.is_empty() {
            return Err(OrchestratorError::EmptyChain);
        }

        Ok(Self {
            chain,
            config,
            fallback: FallbackArtifact::prepare()?,
        })
    }

    /// Create an orchestrator straight from configuration
    pub fn from_config(config: &AtelierConfig) -> Result<Self, OrchestratorError> {
        let chain = FallbackChain::from_config(config)?;
        Self::new(chain, config.orchestrator.clone())
    }

    /// Orchestrator-level settings (the external HTTP layer reads the
    /// degraded-response policy from here)
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Resolve one request to exactly one result
    ///
    /// Never fails: per-provider errors close Attempts, and total
    /// exhaustion resolves to the fixed placeholder artifact.
    pub async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        let deadline = self
            .config
            .request_deadline()
            .map(|d| Instant::now() + d);
        let mut log = AttemptLog::new();

        info!(
            request_id = %request.id,
            providers = self.chain.len(),
            "starting generation"
        );

        for entry in &self.chain.entries {
            let provider = entry.descriptor.name.as_str();
            let protocol = entry.descriptor.protocol();
            let started_at = chrono::Utc::now();

            // Budget for this attempt: the provider's own timeout,
            // clipped by whatever remains of the overall deadline.
            let mut budget = entry.descriptor.timeout();
            let mut deadline_binding = false;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    debug!(request_id = %request.id, provider, "request deadline elapsed, skipping");
                    break;
                }
                if remaining < budget {
                    budget = remaining;
                    deadline_binding = true;
                }
            }

            debug!(request_id = %request.id, provider, %protocol, ?budget, "trying provider");

            match tokio::time::timeout(budget, self.try_provider(entry, &request)).await {
                Ok(Ok(artifact)) => {
                    log.record(Attempt::close(
                        provider,
                        protocol,
                        started_at,
                        AttemptOutcome::Success,
                        None,
                    ));
                    info!(request_id = %request.id, provider, "generation succeeded");
                    return GenerationResult::success(
                        request.id,
                        provider,
                        artifact,
                        log.into_attempts(),
                    );
                }
                Ok(Err(error)) => {
                    warn!(request_id = %request.id, provider, %error, "provider failed, advancing");
                    log.record(Attempt::close(
                        provider,
                        protocol,
                        started_at,
                        error.attempt_outcome(),
                        Some(error.to_string()),
                    ));
                }
                Err(_elapsed) => {
                    warn!(request_id = %request.id, provider, "provider timed out, advancing");
                    log.record(Attempt::close(
                        provider,
                        protocol,
                        started_at,
                        AttemptOutcome::Timeout,
                        Some(ProviderError::Timeout.to_string()),
                    ));
                    if deadline_binding {
                        // The overall deadline cut this attempt short;
                        // lower-priority providers are not tried.
                        debug!(request_id = %request.id, "request deadline elapsed mid-attempt");
                        break;
                    }
                }
            }
        }

        info!(
            request_id = %request.id,
            attempts = log.len(),
            "all providers exhausted, resolving fallback"
        );
        GenerationResult::degraded(
            request.id,
            self.fallback.artifact().clone(),
            log.into_attempts(),
        )
    }

    /// Run one provider to a final artifact or error
    ///
    /// The concurrency permit covers only the submit call; deferred
    /// polling happens without it so a slow task cannot starve other
    /// requests' submits.
    async fn try_provider(
        &self,
        entry: &ChainEntry,
        request: &GenerationRequest,
    ) -> Result<ImageArtifact, ProviderError> {
        let submission = {
            let _permit = match &entry.limiter {
                Some(limiter) => Some(
                    limiter.clone().acquire_owned().await.map_err(|_| {
                        ProviderError::Network("provider limiter closed".to_string())
                    })?,
                ),
                None => None,
            };
            entry.adapter.submit(request).await?
        };

        match submission {
            Submission::Complete(artifact) => Ok(artifact),
            Submission::Deferred(handle) => {
                let poll_config = entry.descriptor.poll.ok_or_else(|| {
                    ProviderError::Rejected(format!(
                        "provider '{}' returned a task but has no polling settings",
                        entry.descriptor.name
                    ))
                })?;

                debug!(
                    request_id = %request.id,
                    provider = %entry.descriptor.name,
                    task_id = %handle.task_id,
                    "task submitted, polling"
                );

                let poller = TaskPoller::new(poll_config.interval(), poll_config.max_attempts);
                let adapter = Arc::clone(&entry.adapter);
                let result = poller
                    .run(|| {
                        let adapter = Arc::clone(&adapter);
                        let handle = handle.clone();
                        async move { adapter.poll(&handle).await }
                    })
                    .await?;

                // The handle dies here with the attempt, whatever the
                // polling outcome was.
                match result {
                    PollResult::Succeeded(artifact) => Ok(artifact),
                    PollResult::Failed(reason) => Err(ProviderError::TaskFailed(reason)),
                    PollResult::TimedOut => Err(ProviderError::Timeout),
                }
            }
        }
    }
}
