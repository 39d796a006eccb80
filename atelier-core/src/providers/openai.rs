//! OpenAI image generation adapter
//!
//! Immediate protocol: one call to the Images API returns the final
//! artifact as base64. Plain prompts go to `/images/generations`;
//! requests carrying a reference image (try-on style edits) go to
//! `/images/edits` as multipart.

use crate::config::ProviderDescriptor;
use crate::http::HttpClient;
use crate::protocol::{GenerationRequest, ImageArtifact, MediaType, ProtocolKind};
use crate::providers::adapter::{ProviderAdapter, Submission};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// OpenAI Images API adapter
pub struct OpenAiAdapter {
    name: String,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(descriptor: &ProviderDescriptor, http: HttpClient) -> Self {
        Self {
            name: descriptor.name.clone(),
            api_key: descriptor.api_key.expose_secret().to_string(),
            base_url: descriptor.base_url.trim_end_matches('/').to_string(),
            model: descriptor.model.clone(),
            timeout: descriptor.timeout(),
            http,
        }
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers
    }

    fn decode(&self, response: ImagesResponse) -> ProviderResult<ImageArtifact> {
        let b64 = response
            .data
            .first()
            .and_then(|d| d.b64_json.as_deref())
            .ok_or_else(|| {
                ProviderError::Parse("response carried no b64_json image data".to_string())
            })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| ProviderError::Parse(format!("invalid base64 image data: {e}")))?;

        Ok(ImageArtifact::new(bytes, MediaType::Png))
    }

    /// Text-only generation via /images/generations
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<ImageArtifact> {
        let url = format!("{}/images/generations", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "size": "1024x1024",
            "n": 1,
        });

        let response: ImagesResponse = self
            .http
            .post_json(&url, &self.headers(), &body, self.timeout)
            .await?;
        self.decode(response)
    }

    /// Reference-image edit via multipart /images/edits
    async fn edit(&self, request: &GenerationRequest) -> ProviderResult<ImageArtifact> {
        let url = format!("{}/images/edits", self.base_url);
        let reference = &request.reference_images[0];

        let part = reqwest::multipart::Part::bytes(reference.bytes.clone())
            .file_name("reference.png")
            .mime_str(reference.media_type.as_str())
            .map_err(|e| ProviderError::Rejected(format!("unsupported media type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", "1024x1024")
            .part("image", part);

        let response: ImagesResponse = self
            .http
            .post_multipart(&url, &self.headers(), form, self.timeout)
            .await?;
        self.decode(response)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::Immediate
    }

    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<Submission> {
        debug!(
            provider = %self.name,
            request_id = %request.id,
            references = request.reference_images.len(),
            "submitting to OpenAI images API"
        );

        let artifact = if request.reference_images.is_empty() {
            self.generate(request).await?
        } else {
            self.edit(request).await?
        };

        Ok(Submission::Complete(artifact))
    }
}
