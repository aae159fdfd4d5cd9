//! HTTP-level coverage of the reference `LlmClient` implementation against a
//! mocked OpenAI-compatible endpoint.

use std::time::Duration;

use browser_agent_core::llm_client::{ChatMessage, CompletionRequest, LlmClient, LlmError, OpenAiCompatibleClient};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gpt-4o".into(),
        messages: vec![ChatMessage::system("be terse")],
        temperature: 0.3,
        max_tokens: 256,
        json_mode: true,
    }
}

#[tokio::test]
async fn successful_completion_extracts_the_first_choices_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{\"ok\": true}"}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(server.uri(), "test-key", Duration::from_secs(5));
    let response = client.complete(request()).await.unwrap();
    assert_eq!(response.content, "{\"ok\": true}");
}

#[tokio::test]
async fn empty_choices_is_an_empty_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(server.uri(), "test-key", Duration::from_secs(5));
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn blank_content_is_an_empty_content_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "   "}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(server.uri(), "test-key", Duration::from_secs(5));
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyContent));
}

#[tokio::test]
async fn server_error_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(server.uri(), "test-key", Duration::from_secs(5));
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)));
}
