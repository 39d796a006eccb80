//! Google Gemini adapter
//!
//! Immediate protocol: `generateContent` takes the prompt plus every
//! reference image as inline data and answers with inline image parts.

use crate::config::ProviderDescriptor;
use crate::http::HttpClient;
use crate::protocol::{GenerationRequest, ImageArtifact, MediaType, ProtocolKind};
use crate::providers::adapter::{ProviderAdapter, Submission};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Gemini generateContent adapter
pub struct GeminiAdapter {
    name: String,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

impl GeminiAdapter {
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
        headers.insert("x-goog-api-key".to_string(), self.api_key.clone());
        headers
    }

    /// Build the parts array: reference images first, prompt last
    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut parts: Vec<Value> = request
            .reference_images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.media_type.as_str(),
                        "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.prompt }));

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE"] },
        })
    }

    fn decode(&self, response: GenerateContentResponse) -> ProviderResult<ImageArtifact> {
        let inline = response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts)
            .unwrap_or_default()
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| {
                ProviderError::Parse("response carried no inline image data".to_string())
            })?;

        let media_type = MediaType::from_mime(&inline.mime_type).ok_or_else(|| {
            ProviderError::Parse(format!("unsupported media type '{}'", inline.mime_type))
        })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::Parse(format!("invalid base64 image data: {e}")))?;

        Ok(ImageArtifact::new(bytes, media_type))
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::Immediate
    }

    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<Submission> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(
            provider = %self.name,
            request_id = %request.id,
            references = request.reference_images.len(),
            "submitting to Gemini generateContent"
        );

        let body = self.request_body(request);
        let response: GenerateContentResponse = self
            .http
            .post_json(&url, &self.headers(), &body, self.timeout)
            .await?;

        Ok(Submission::Complete(self.decode(response)?))
    }
}
