//! HTTP status mapping utilities

use crate::providers::error::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Map a non-success HTTP status and response body to a ProviderError
pub fn map_status(status: StatusCode, headers: Option<&HeaderMap>, body: Option<String>) -> ProviderError {
    let message = body
        .as_deref()
        .and_then(extract_error_message)
        .or(body.clone())
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication,

        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after: headers.and_then(parse_retry_after),
        },

        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,

        status if status.is_server_error() => ProviderError::Server {
            status: status.as_u16(),
            message,
        },

        // Remaining 4xx (bad request, unprocessable input, unknown
        // model, ...) mean the backend refused the request itself.
        status if status.is_client_error() => ProviderError::Rejected(message),

        _ => ProviderError::Network(format!("unexpected status {}: {}", status.as_u16(), message)),
    }
}

/// Parse a Retry-After header given in seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pull a human-readable message out of common error body shapes
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    // OpenAI: { "error": { "message": "..." } }
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Some(message.to_string());
    }

    // Gemini: { "error": { "status": "...", "message": "..." } } is
    // covered above; Replicate: { "detail": "..." }
    if let Some(detail) = json.get("detail").and_then(|d| d.as_str()) {
        return Some(detail.to_string());
    }

    // Flat { "error": "..." }
    if let Some(message) = json.get("error").and_then(|e| e.as_str()) {
        return Some(message.to_string());
    }

    None
}
