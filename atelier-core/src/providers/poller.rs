//! Bounded polling loop for deferred generation tasks
//!
//! Written once and used for every deferred provider: sleep, poll,
//! repeat until the task resolves or the attempt budget runs out. The
//! loop holds no shared state and suspends at every sleep and poll, so
//! the enclosing timeout can cancel it promptly and concurrent
//! requests never block each other.

use crate::protocol::ImageArtifact;
use crate::providers::adapter::PollOutcome;
use crate::providers::error::{ProviderError, ProviderResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Terminal result of a polling loop
#[derive(Debug, Clone)]
pub enum PollResult {
    /// The task produced an image
    Succeeded(ImageArtifact),
    /// The task failed for good
    Failed(String),
    /// The attempt budget ran out with the task still pending
    TimedOut,
}

/// Generic bounded poller
#[derive(Debug, Clone, Copy)]
pub struct TaskPoller {
    interval: Duration,
    max_attempts: u32,
}

impl TaskPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Drive `poll` until the task resolves or the budget is exhausted
    ///
    /// A `Failed` outcome or a poll error ends the loop immediately;
    /// there is no retry of a failed poll.
    pub async fn run<F, Fut>(&self, mut poll: F) -> ProviderResult<PollResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollOutcome, ProviderError>>,
    {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            match poll().await? {
                PollOutcome::Pending => {
                    debug!(attempt, max = self.max_attempts, "task still pending");
                }
                PollOutcome::Succeeded(artifact) => {
                    debug!(attempt, "task succeeded");
                    return Ok(PollResult::Succeeded(artifact));
                }
                PollOutcome::Failed(reason) => {
                    debug!(attempt, %reason, "task failed");
                    return Ok(PollResult::Failed(reason));
                }
            }
        }

        debug!(max = self.max_attempts, "poll budget exhausted");
        Ok(PollResult::TimedOut)
    }
}
