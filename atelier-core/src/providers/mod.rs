//! Provider adapters for generation backends
//!
//! One adapter per backend, all behind the `ProviderAdapter` contract
//! so the orchestrator never needs to know whether a backend answers
//! synchronously or via a polled task.

pub mod adapter;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod poller;
pub mod replicate;

pub use adapter::{PollOutcome, ProviderAdapter, ProviderKind, Submission};
pub use error::{ProviderError, ProviderResult};
pub use poller::{PollResult, TaskPoller};

// Re-export concrete adapters
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use replicate::ReplicateAdapter;
