//! Core protocol types for generation requests and results

pub mod types;

pub use types::{
    Attempt, AttemptLog, AttemptOutcome, GenerationRequest, GenerationResult, ImageArtifact,
    MediaType, ProtocolKind, ReferenceImage, ResultOutcome, TaskHandle,
};
