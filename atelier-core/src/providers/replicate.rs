//! Replicate prediction adapter
//!
//! Deferred protocol: submitting creates a prediction and returns its
//! id as a task handle; status is polled until the prediction resolves
//! and the finished artifact is downloaded from the output URL.

use crate::config::ProviderDescriptor;
use crate::http::HttpClient;
use crate::protocol::{GenerationRequest, ImageArtifact, MediaType, ProtocolKind, TaskHandle};
use crate::providers::adapter::{PollOutcome, ProviderAdapter, Submission};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Replicate predictions adapter
pub struct ReplicateAdapter {
    name: String,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ReplicateAdapter {
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

    /// Pull the first output URL from a finished prediction
    fn first_output_url(prediction: &Prediction) -> ProviderResult<String> {
        let output = prediction
            .output
            .as_ref()
            .ok_or_else(|| ProviderError::Parse("prediction finished without output".to_string()))?;

        // Output is either a list of URLs or a single URL string.
        let url = match output {
            serde_json::Value::Array(urls) => urls.first().and_then(|u| u.as_str()),
            serde_json::Value::String(url) => Some(url.as_str()),
            _ => None,
        };

        url.map(str::to_string).ok_or_else(|| {
            ProviderError::Parse("prediction output carried no image URL".to_string())
        })
    }
}

#[async_trait]
impl ProviderAdapter for ReplicateAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::Deferred
    }

    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<Submission> {
        let url = format!("{}/models/{}/predictions", self.base_url, self.model);
        debug!(
            provider = %self.name,
            request_id = %request.id,
            "creating Replicate prediction"
        );

        let body = json!({
            "input": {
                "prompt": request.prompt,
                "width": 1024,
                "height": 1024,
            }
        });

        let prediction: Prediction = self
            .http
            .post_json(&url, &self.headers(), &body, self.timeout)
            .await?;

        if prediction.status == "failed" || prediction.status == "canceled" {
            return Err(ProviderError::TaskFailed(
                prediction
                    .error
                    .unwrap_or_else(|| format!("prediction {} on submit", prediction.status)),
            ));
        }

        Ok(Submission::Deferred(TaskHandle::new(
            self.name.clone(),
            prediction.id,
        )))
    }

    async fn poll(&self, handle: &TaskHandle) -> ProviderResult<PollOutcome> {
        let url = format!("{}/predictions/{}", self.base_url, handle.task_id);
        let prediction: Prediction = self
            .http
            .get_json(&url, &self.headers(), self.timeout)
            .await?;

        debug!(
            provider = %self.name,
            task_id = %handle.task_id,
            status = %prediction.status,
            "polled Replicate prediction"
        );

        match prediction.status.as_str() {
            "starting" | "processing" => Ok(PollOutcome::Pending),
            "succeeded" => {
                let output_url = Self::first_output_url(&prediction)?;
                let bytes = self.http.get_bytes(&output_url, self.timeout).await?;
                Ok(PollOutcome::Succeeded(ImageArtifact::new(
                    bytes,
                    MediaType::Png,
                )))
            }
            "failed" | "canceled" => Ok(PollOutcome::Failed(
                prediction
                    .error
                    .unwrap_or_else(|| format!("prediction {}", prediction.status)),
            )),
            other => Err(ProviderError::Parse(format!(
                "unknown prediction status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_url_from_array() {
        let prediction = Prediction {
            id: "p1".to_string(),
            status: "succeeded".to_string(),
            output: Some(json!(["https://img.example.com/a.png", "https://img.example.com/b.png"])),
            error: None,
        };
        assert_eq!(
            ReplicateAdapter::first_output_url(&prediction).unwrap(),
            "https://img.example.com/a.png"
        );
    }

    #[test]
    fn test_first_output_url_from_string() {
        let prediction = Prediction {
            id: "p1".to_string(),
            status: "succeeded".to_string(),
            output: Some(json!("https://img.example.com/only.png")),
            error: None,
        };
        assert_eq!(
            ReplicateAdapter::first_output_url(&prediction).unwrap(),
            "https://img.example.com/only.png"
        );
    }

    #[test]
    fn test_missing_output_is_parse_error() {
        let prediction = Prediction {
            id: "p1".to_string(),
            status: "succeeded".to_string(),
            output: None,
            error: None,
        };
        assert!(matches!(
            ReplicateAdapter::first_output_url(&prediction),
            Err(ProviderError::Parse(_))
        ));
    }
}
