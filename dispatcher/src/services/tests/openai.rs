//! Tests for the OpenAI adapter

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::{ProviderId, Role, RoleMessage};
use crate::config::VendorConfig;
use crate::error::VendorError;
use crate::services::tests::{fast_retry, image_request, text_request, vendor_config};
use crate::services::OpenAiClient;
use crate::traits::VendorClient;
use crate::types::{PromptPayload, DRY_RUN_TEXT_MARKER};

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(vendor_config(&server.uri()), fast_retry(), Duration::from_secs(5)).unwrap()
}

fn chat_response(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
    })
}

#[tokio::test]
async fn test_chat_completion_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "messages": [{"role": "system", "content": "Be brief."}, {"role": "user", "content": "Hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let request = text_request(
        ProviderId::OpenAI,
        "gpt-4",
        PromptPayload::Chat(vec![RoleMessage::new(Role::System, "Be brief."), RoleMessage::new(Role::User, "Hi")]),
    );
    let result = client(&server).invoke(&request, false).await.unwrap();

    assert_eq!(result.completion, "Hello!");
    assert_eq!(result.usage.prompt_tokens, 9);
    assert_eq!(result.usage.total(), 13);
    assert_eq!(result.retries, 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("third time")))
        .expect(1)
        .mount(&server)
        .await;

    let request = text_request(ProviderId::OpenAI, "gpt-3.5-turbo", PromptPayload::Flat("Hi".into()));
    let result = client(&server).invoke(&request, false).await.unwrap();

    assert_eq!(result.completion, "third time");
    assert_eq!(result.retries, 2);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Incorrect API key"}})))
        .expect(1)
        .mount(&server)
        .await;

    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = client(&server).invoke(&request, false).await.unwrap_err();

    assert!(matches!(failure.error, VendorError::Auth { status: 401, .. }));
    assert_eq!(failure.retries, 0);
}

#[tokio::test]
async fn test_rate_limit_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .expect(3)
        .mount(&server)
        .await;

    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = client(&server).invoke(&request, false).await.unwrap_err();

    assert!(matches!(failure.error, VendorError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(1)));
    assert_eq!(failure.retries, 2);
}

#[tokio::test]
async fn test_malformed_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "chatcmpl-1", "choices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = client(&server).invoke(&request, false).await.unwrap_err();
    assert!(matches!(failure.error, VendorError::Protocol { .. }));
}

#[tokio::test]
async fn test_dall_e_image_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(body_partial_json(json!({"model": "dall-e-3", "response_format": "b64_json", "size": "1024x1024"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created": 1, "data": [{"b64_json": "aGVsbG8="}]})))
        .expect(1)
        .mount(&server)
        .await;

    let request = image_request(ProviderId::OpenAI, "dall-e", "a lighthouse at dusk");
    let result = client(&server).invoke(&request, false).await.unwrap();
    assert_eq!(result.completion, "aGVsbG8=");
    assert_eq!(result.usage.total(), 0);
}

#[tokio::test]
async fn test_dry_run_never_calls_the_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    // No key configured: dry runs must still succeed
    let adapter = OpenAiClient::new(VendorConfig::new(None, server.uri()), fast_retry(), Duration::from_secs(5)).unwrap();
    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let result = adapter.invoke(&request, true).await.unwrap();

    assert_eq!(result.completion, DRY_RUN_TEXT_MARKER);
    assert_eq!(result.usage.total(), 0);
}

#[tokio::test]
async fn test_missing_key_fails_before_io() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let adapter = OpenAiClient::new(VendorConfig::new(None, server.uri()), fast_retry(), Duration::from_secs(5)).unwrap();
    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = adapter.invoke(&request, false).await.unwrap_err();
    assert!(matches!(failure.error, VendorError::Auth { .. }));
}

#[tokio::test]
async fn test_invalid_config_rejected_even_in_dry_run() {
    let server = MockServer::start().await;
    let mut request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    request.config.temperature = 9.0;

    let failure = client(&server).invoke(&request, true).await.unwrap_err();
    assert!(matches!(failure.error, VendorError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_request_timeout_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("too slow"))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let adapter = OpenAiClient::new(vendor_config(&server.uri()), fast_retry(), Duration::from_millis(50)).unwrap();
    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = adapter.invoke(&request, false).await.unwrap_err();

    assert!(matches!(failure.error, VendorError::Timeout));
    assert_eq!(failure.retries, 2);
}

#[tokio::test]
async fn test_connection_refused_is_retried_as_unavailable() {
    // Reserve a port, then free it so nothing is listening there
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

    let adapter = OpenAiClient::new(
        vendor_config(&format!("http://127.0.0.1:{port}")),
        fast_retry(),
        Duration::from_secs(5),
    )
    .unwrap();
    let request = text_request(ProviderId::OpenAI, "gpt-4", PromptPayload::Flat("Hi".into()));
    let failure = adapter.invoke(&request, false).await.unwrap_err();

    assert!(matches!(failure.error, VendorError::Unavailable { status: None, .. }));
    assert!(failure.error.is_transient());
    assert_eq!(failure.retries, 2);
}
