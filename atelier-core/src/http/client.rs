//! Shared HTTP client implementation using reqwest

use crate::http::error::map_status;
use crate::providers::error::{ProviderError, ProviderResult};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size (16MB; image payloads are base64-inflated)
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("atelier/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> ProviderResult<Self> {
        Self::with_config(Duration::from_secs(10), 10)
    }

    /// Create a new HTTP client with custom connection settings
    pub fn with_config(connect_timeout: Duration, max_idle_per_host: usize) -> ProviderResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// POST a JSON body and parse a JSON response
    pub async fn post_json<B, R>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &B,
        timeout: Duration,
    ) -> ProviderResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let builder = self.client.post(url).timeout(timeout).json(body);
        let response = self.send(builder, headers, url).await?;
        self.read_json(response, url).await
    }

    /// GET a JSON resource
    pub async fn get_json<R>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> ProviderResult<R>
    where
        R: DeserializeOwned,
    {
        let builder = self.client.get(url).timeout(timeout);
        let response = self.send(builder, headers, url).await?;
        self.read_json(response, url).await
    }

    /// POST a multipart form and parse a JSON response
    pub async fn post_multipart<R>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        form: reqwest::multipart::Form,
        timeout: Duration,
    ) -> ProviderResult<R>
    where
        R: DeserializeOwned,
    {
        let builder = self.client.post(url).timeout(timeout).multipart(form);
        let response = self.send(builder, headers, url).await?;
        self.read_json(response, url).await
    }

    /// Download raw bytes (e.g. a finished artifact from a result URL)
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> ProviderResult<Vec<u8>> {
        let builder = self.client.get(url).timeout(timeout);
        let response = self.send(builder, &HashMap::new(), url).await?;
        self.check_content_length(&response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(format!("failed to read response body: {e}")))?;

        if bytes.len() > self.max_response_size {
            return Err(ProviderError::Parse(format!(
                "response size {} exceeds maximum {}",
                bytes.len(),
                self.max_response_size
            )));
        }

        Ok(bytes.to_vec())
    }

    /// Execute a request and surface non-success statuses as errors
    async fn send(
        &self,
        mut builder: RequestBuilder,
        headers: &HashMap<String, String>,
        url: &str,
    ) -> ProviderResult<Response> {
        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        debug!(url, "dispatching request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url, "request timed out");
                ProviderError::Timeout
            } else {
                warn!(url, error = %e, "request failed");
                ProviderError::from(e)
            }
        })?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "response received");

        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.ok();
            warn!(url, status = status.as_u16(), "request rejected by backend");
            return Err(map_status(status, Some(&headers), body));
        }

        Ok(response)
    }

    /// Read and parse a JSON response body, enforcing size limits
    async fn read_json<R>(&self, response: Response, url: &str) -> ProviderResult<R>
    where
        R: DeserializeOwned,
    {
        self.check_content_length(&response)?;

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("failed to read response body: {e}")))?;

        if text.len() > self.max_response_size {
            return Err(ProviderError::Parse(format!(
                "response size {} exceeds maximum {}",
                text.len(),
                self.max_response_size
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(url, error = %e, "failed to parse response body");
            ProviderError::Parse(e.to_string())
        })
    }

    fn check_content_length(&self, response: &Response) -> ProviderResult<()> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(ProviderError::Parse(format!(
                    "response size {} exceeds maximum {}",
                    content_length, self.max_response_size
                )));
            }
        }
        Ok(())
    }
}
