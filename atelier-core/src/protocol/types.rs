//! Data model for the generation pipeline
//!
//! These are the types exchanged between the caller, the orchestrator,
//! and the provider adapters. The design prioritizes:
//! - Immutability: requests and results never change after construction
//! - Type safety: outcomes are closed enums, never strings or Options
//! - Observability: every provider tried leaves exactly one Attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Media type of an image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    WebP,
}

impl MediaType {
    /// The MIME string for this media type
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::WebP => "image/webp",
        }
    }

    /// Parse a MIME string, tolerating parameters like `; charset=...`
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.split(';').next().map(str::trim) {
            Some("image/png") => Some(MediaType::Png),
            Some("image/jpeg") | Some("image/jpg") => Some(MediaType::Jpeg),
            Some("image/webp") => Some(MediaType::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque reference image supplied with a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Raw image bytes
    pub bytes: Vec<u8>,

    /// Declared media type of the bytes
    pub media_type: MediaType,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self { bytes, media_type }
    }
}

/// A generated (or placeholder) image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Encoded image bytes
    pub bytes: Vec<u8>,

    /// Media type of the bytes
    pub media_type: MediaType,
}

impl ImageArtifact {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self { bytes, media_type }
    }

    /// Convenience constructor for PNG payloads
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MediaType::Png)
    }
}

/// A single generation request, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Unique request identifier
    pub id: Uuid,

    /// Prompt text describing the desired image
    pub prompt: String,

    /// Ordered reference images (e.g. the person photo for a try-on)
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,

    /// Free-form style/context parameters
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub style_params: HashMap<String, serde_json::Value>,

    /// When the request was created
    pub created_at: DateTime<Utc>,
}

impl GenerationRequest {
    /// Create a new request with a generated id and current timestamp
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            reference_images: Vec::new(),
            style_params: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a reference image (order is preserved)
    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    /// Set a style/context parameter
    pub fn with_style_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.style_params.insert(key.into(), value.into());
        self
    }
}

/// Interaction protocol of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// The provider returns the final image from a single call
    Immediate,
    /// The provider returns a task handle; the result is polled later
    Deferred,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Immediate => f.write_str("immediate"),
            ProtocolKind::Deferred => f.write_str("deferred"),
        }
    }
}

/// Handle to an in-flight deferred generation task
///
/// Exists only between a deferred submit and the final poll outcome;
/// it is discarded once the owning Attempt closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Provider that owns the task
    pub provider: String,

    /// Opaque task identifier assigned by the provider
    pub task_id: String,

    /// When the task was submitted
    pub submitted_at: DateTime<Utc>,
}

impl TaskHandle {
    pub fn new(provider: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            task_id: task_id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// How a single provider attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The provider produced an image
    Success,
    /// Infrastructure-level failure (network, 5xx, rate limit)
    TransientFailure,
    /// The provider rejected the request itself
    PermanentFailure,
    /// The submit call or polling loop exceeded its budget
    Timeout,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// Record of one provider being tried for one request
///
/// Exactly one Attempt is appended per provider tried; attempts are
/// ordered by priority rank and never mutated after being closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Provider name
    pub provider: String,

    /// Protocol the provider speaks
    pub protocol: ProtocolKind,

    /// When the attempt started
    pub started_at: DateTime<Utc>,

    /// When the attempt closed
    pub finished_at: DateTime<Utc>,

    /// Final outcome
    pub outcome: AttemptOutcome,

    /// Error detail for failed attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Attempt {
    /// Close an attempt that started at `started_at`
    pub fn close(
        provider: impl Into<String>,
        protocol: ProtocolKind,
        started_at: DateTime<Utc>,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            protocol,
            started_at,
            finished_at: Utc::now(),
            outcome,
            error,
        }
    }
}

/// Append-only attempt history for one request
///
/// Pure data; the orchestrator records into it and hands the list to
/// the result unchanged.
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    attempts: Vec<Attempt>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closed attempt
    pub fn record(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn into_attempts(self) -> Vec<Attempt> {
        self.attempts
    }
}

/// Final outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOutcome {
    /// A provider produced the image
    Success,
    /// Every provider failed; the image is the fixed placeholder
    DegradedFallback,
}

/// The single result produced for a request, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Identifier of the originating request
    pub request_id: Uuid,

    /// Whether a provider succeeded or the fallback was used
    pub outcome: ResultOutcome,

    /// The image to return to the caller (placeholder on fallback)
    pub image: ImageArtifact,

    /// Provider that produced the image; `None` for the fallback
    pub provider: Option<String>,

    /// Full ordered attempt history
    pub attempts: Vec<Attempt>,
}

impl GenerationResult {
    /// Build a successful result from the winning provider's artifact
    pub fn success(
        request_id: Uuid,
        provider: impl Into<String>,
        image: ImageArtifact,
        attempts: Vec<Attempt>,
    ) -> Self {
        Self {
            request_id,
            outcome: ResultOutcome::Success,
            image,
            provider: Some(provider.into()),
            attempts,
        }
    }

    /// Build a degraded result carrying the fixed fallback artifact
    pub fn degraded(request_id: Uuid, image: ImageArtifact, attempts: Vec<Attempt>) -> Self {
        Self {
            request_id,
            outcome: ResultOutcome::DegradedFallback,
            image,
            provider: None,
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResultOutcome::Success)
    }
}
