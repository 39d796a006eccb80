//! HTTP layer for talking to generation backends
//!
//! A single pooled client is shared by every adapter, handling:
//! - Connection pooling and timeouts
//! - Response size and content-type guards
//! - Mapping transport and status failures onto `ProviderError`

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::map_status;
