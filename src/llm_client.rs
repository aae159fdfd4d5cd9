//! The LLM Backend: an OpenAI-compatible chat-completions endpoint with
//! JSON-mode output and vision input. Out of the core's scope per the
//! specification — the core only depends on the [`LlmClient`] trait.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One piece of a (possibly multimodal) message.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    /// A data URL or remote image URL, attached at `detail: "auto"`.
    ImageUrl(String),
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: parts,
        }
    }
}

/// A request to the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Request `response_format: {"type": "json_object"}`.
    pub json_mode: bool,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint returned no choices")]
    EmptyResponse,
    #[error("endpoint returned empty content")]
    EmptyContent,
}

/// Drives the chat-completions endpoint that plans each step and
/// (separately) summarises history during compaction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Reference implementation against an OpenAI-compatible `/chat/completions`
/// endpoint, following the request-shape conventions of the teacher's
/// `llm_integration.rs` (system + user message, temperature, max_tokens,
/// timeout-wrapped call) translated from a streaming local-model call to a
/// single non-streaming HTTP round trip.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn build_payload(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                if m.content.len() == 1 {
                    if let ContentPart::Text(text) = &m.content[0] {
                        return serde_json::json!({"role": m.role.as_str(), "content": text});
                    }
                }
                let parts: Vec<serde_json::Value> = m
                    .content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => {
                            serde_json::json!({"type": "text", "text": text})
                        }
                        ContentPart::ImageUrl(url) => {
                            serde_json::json!({"type": "image_url", "image_url": {"url": url, "detail": "auto"}})
                        }
                    })
                    .collect();
                serde_json::json!({"role": m.role.as_str(), "content": parts})
            })
            .collect();

        let mut payload = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            payload["response_format"] = serde_json::json!({"type": "json_object"});
        }
        payload
    }
}

#[derive(Deserialize)]
struct RawCompletion {
    choices: Vec<RawChoice>,
}

#[derive(Deserialize)]
struct RawChoice {
    message: RawMessage,
}

#[derive(Deserialize)]
struct RawMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let payload = self.build_payload(&request);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let send = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let parsed: RawCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content
            .ok_or(LlmError::EmptyContent)?;

        if content.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        Ok(CompletionResponse { content })
    }
}

/// A scriptable [`LlmClient`] for tests: queued responses consumed in FIFO
/// order, falling back to an error once exhausted.
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(CompletionResponse { content }),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::EmptyContent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_queued_responses_in_order() {
        let client = MockLlmClient::new();
        client.queue_text("first");
        client.queue_text("second");

        let request = CompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::system("sys")],
            temperature: 0.3,
            max_tokens: 4096,
            json_mode: true,
        };

        let first = client.complete(request.clone()).await.unwrap();
        assert_eq!(first.content, "first");
        let second = client.complete(request).await.unwrap();
        assert_eq!(second.content, "second");
    }

    #[tokio::test]
    async fn mock_client_errors_once_exhausted() {
        let client = MockLlmClient::new();
        client.queue_text("only one");
        let request = CompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![],
            temperature: 0.3,
            max_tokens: 10,
            json_mode: false,
        };
        client.complete(request.clone()).await.unwrap();
        let err = client.complete(request).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[test]
    fn payload_uses_plain_string_content_for_text_only_messages() {
        let client = OpenAiCompatibleClient::new("https://api.example.com", "key", Duration::from_secs(30));
        let request = CompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::system("be terse")],
            temperature: 0.3,
            max_tokens: 100,
            json_mode: true,
        };
        let payload = client.build_payload(&request);
        assert_eq!(payload["messages"][0]["content"], "be terse");
        assert_eq!(payload["response_format"]["type"], "json_object");
    }

    #[test]
    fn payload_uses_part_array_for_multimodal_messages() {
        let client = OpenAiCompatibleClient::new("https://api.example.com", "key", Duration::from_secs(30));
        let request = CompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::user(vec![
                ContentPart::Text("look at this".into()),
                ContentPart::ImageUrl("data:image/png;base64,AAA".into()),
            ])],
            temperature: 0.3,
            max_tokens: 100,
            json_mode: false,
        };
        let payload = client.build_payload(&request);
        let parts = payload["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["type"], "image_url");
    }
}
