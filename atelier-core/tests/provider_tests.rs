//! Tests for the concrete provider adapters against a mock HTTP server
//!
//! Each adapter is pointed at a wiremock server and exercised through
//! the `ProviderAdapter` contract: request shape, auth headers, payload
//! decoding, and error mapping.

use atelier_core::config::{AtelierConfig, PollConfig, ProviderDescriptor, SecretString};
use atelier_core::http::HttpClient;
use atelier_core::orchestrator::{FallbackChain, Orchestrator};
use atelier_core::protocol::{GenerationRequest, MediaType, ReferenceImage, ResultOutcome};
use atelier_core::providers::{
    GeminiAdapter, OpenAiAdapter, PollOutcome, ProviderAdapter, ProviderError, ProviderKind,
    ReplicateAdapter, Submission,
};
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4e, 0x47];

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn descriptor(name: &str, kind: ProviderKind, base_url: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        name: name.to_string(),
        kind,
        api_key: SecretString::new("sk-test"),
        base_url: base_url.to_string(),
        model: "test-model".to_string(),
        priority: 1,
        timeout_ms: 5_000,
        poll: match kind {
            ProviderKind::Replicate => Some(PollConfig {
                interval_ms: 10,
                max_attempts: 10,
            }),
            _ => None,
        },
        max_concurrent: None,
        enabled: true,
    }
}

#[tokio::test]
async fn test_openai_generation_decodes_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": b64(PNG_MAGIC) }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        &descriptor("openai", ProviderKind::OpenAi, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let submission = adapter
        .submit(&GenerationRequest::new("a red dress"))
        .await
        .unwrap();

    match submission {
        Submission::Complete(artifact) => {
            assert_eq!(artifact.bytes, PNG_MAGIC);
            assert_eq!(artifact.media_type, MediaType::Png);
        }
        Submission::Deferred(_) => panic!("immediate provider returned a task"),
    }
}

#[tokio::test]
async fn test_openai_reference_image_routes_to_edits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/edits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": b64(PNG_MAGIC) }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        &descriptor("openai", ProviderKind::OpenAi, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let request = GenerationRequest::new("try this on")
        .with_reference_image(ReferenceImage::new(vec![1, 2, 3], MediaType::Jpeg));

    let submission = adapter.submit(&request).await.unwrap();
    assert!(matches!(submission, Submission::Complete(_)));
}

#[tokio::test]
async fn test_openai_unauthorized_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "invalid api key" }
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        &descriptor("openai", ProviderKind::OpenAi, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let error = adapter
        .submit(&GenerationRequest::new("a red dress"))
        .await
        .unwrap_err();

    assert!(matches!(error, ProviderError::Authentication));
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_openai_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "overloaded" }
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        &descriptor("openai", ProviderKind::OpenAi, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let error = adapter
        .submit(&GenerationRequest::new("a red dress"))
        .await
        .unwrap_err();

    match error {
        ProviderError::Server { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        &descriptor("openai", ProviderKind::OpenAi, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let error = adapter
        .submit(&GenerationRequest::new("a red dress"))
        .await
        .unwrap_err();

    assert!(matches!(error, ProviderError::Parse(_)));
}

#[tokio::test]
async fn test_gemini_inline_data_decodes_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": b64(PNG_MAGIC) } }
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(
        &descriptor("gemini", ProviderKind::Gemini, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let submission = adapter
        .submit(&GenerationRequest::new("an evening gown"))
        .await
        .unwrap();

    match submission {
        Submission::Complete(artifact) => {
            assert_eq!(artifact.bytes, PNG_MAGIC);
            assert_eq!(artifact.media_type, MediaType::Png);
        }
        Submission::Deferred(_) => panic!("immediate provider returned a task"),
    }
}

#[tokio::test]
async fn test_gemini_text_only_response_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "sorry, no image" }] } }]
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(
        &descriptor("gemini", ProviderKind::Gemini, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let error = adapter
        .submit(&GenerationRequest::new("an evening gown"))
        .await
        .unwrap_err();

    assert!(matches!(error, ProviderError::Parse(_)));
}

#[tokio::test]
async fn test_replicate_submit_then_poll_to_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model/predictions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "pred-1",
            "status": "starting"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // First poll still in flight, second resolved.
    Mock::given(method("GET"))
        .and(path("/predictions/pred-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-1",
            "status": "processing"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/predictions/pred-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-1",
            "status": "succeeded",
            "output": [format!("{}/files/out.png", server.uri())]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/out.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_MAGIC))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ReplicateAdapter::new(
        &descriptor("replicate", ProviderKind::Replicate, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let handle = match adapter
        .submit(&GenerationRequest::new("a silk scarf"))
        .await
        .unwrap()
    {
        Submission::Deferred(handle) => handle,
        Submission::Complete(_) => panic!("deferred provider answered synchronously"),
    };
    assert_eq!(handle.task_id, "pred-1");

    assert!(matches!(
        adapter.poll(&handle).await.unwrap(),
        PollOutcome::Pending
    ));
    match adapter.poll(&handle).await.unwrap() {
        PollOutcome::Succeeded(artifact) => assert_eq!(artifact.bytes, PNG_MAGIC),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replicate_failed_prediction_reports_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/predictions/pred-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-2",
            "status": "failed",
            "error": "NSFW content detected"
        })))
        .mount(&server)
        .await;

    let adapter = ReplicateAdapter::new(
        &descriptor("replicate", ProviderKind::Replicate, &server.uri()),
        HttpClient::new().unwrap(),
    );
    let handle = atelier_core::protocol::TaskHandle::new("replicate", "pred-2");

    match adapter.poll(&handle).await.unwrap() {
        PollOutcome::Failed(reason) => assert!(reason.contains("NSFW")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chain_from_config_falls_through_to_replicate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "internal error" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/test-model/predictions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "pred-3",
            "status": "starting"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/predictions/pred-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pred-3",
            "status": "succeeded",
            "output": format!("{}/files/out.png", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/out.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_MAGIC))
        .mount(&server)
        .await;

    let mut openai = descriptor("openai", ProviderKind::OpenAi, &server.uri());
    openai.priority = 1;
    let mut replicate = descriptor("replicate", ProviderKind::Replicate, &server.uri());
    replicate.priority = 2;

    let config: AtelierConfig = serde_json::from_value(json!({
        "version": "0.1",
        "providers": [openai, replicate]
    }))
    .unwrap();

    let chain = FallbackChain::from_config(&config).unwrap();
    assert_eq!(chain.provider_names(), vec!["openai", "replicate"]);

    let orch = Orchestrator::new(chain, config.orchestrator.clone()).unwrap();
    let result = orch.generate(GenerationRequest::new("a trench coat")).await;

    assert_eq!(result.outcome, ResultOutcome::Success);
    assert_eq!(result.provider.as_deref(), Some("replicate"));
    assert_eq!(result.attempts.len(), 2);
    assert_eq!(result.image.bytes, PNG_MAGIC);
}
