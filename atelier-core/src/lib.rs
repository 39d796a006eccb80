//! Atelier Core Library
//!
//! This crate turns one image-generation request into exactly one
//! result by trying a prioritized chain of heterogeneous backends.
//! Providers that fail or time out advance the chain; exhaustion
//! resolves to a deterministic placeholder artifact instead of an
//! error.

pub mod config;
pub mod fallback;
pub mod http;
pub mod orchestrator;
pub mod protocol;
pub mod providers;

pub use orchestrator::{FallbackChain, Orchestrator, OrchestratorError};
pub use protocol::{GenerationRequest, GenerationResult, ResultOutcome};

/// Returns the version of the Atelier Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
