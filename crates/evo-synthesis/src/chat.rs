use crate::error::SynthesisError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Bounded receive timeout for one chat call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// How much of an error body to keep in the error value.
const ERROR_BODY_LIMIT: usize = 320;

/// One outbound chat request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub prompt: String,
}

/// Token usage attributed by the provider. Absent fields default to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The model's reply: the first text content block plus usage.
#[derive(Clone, Debug)]
pub struct ChatReply {
    pub text: String,
    pub usage: TokenUsage,
}

/// Transport seam for the chat completion endpoint.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, SynthesisError>;
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

/// Real transport: HTTP POST to the Anthropic messages endpoint.
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SynthesisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SynthesisError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::RequestFailed(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ANTHROPIC_ENDPOINT.to_string(),
            api_key,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, SynthesisError> {
        let payload = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt,
                }
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SynthesisError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ApiError {
                status,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::RequestFailed(format!("invalid response body: {e}")))?;

        let text = body
            .content
            .iter()
            .find(|part| part.content_type == "text")
            .and_then(|part| part.text.clone())
            .unwrap_or_default();

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens.unwrap_or(0),
                output_tokens: u.output_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(ChatReply { text, usage })
    }
}

/// Scripted transport for tests and the demo: replies are served in FIFO
/// order and the last reply repeats once the script runs out.
#[derive(Clone, Default)]
pub struct SimulatedChatModel {
    replies: Arc<Mutex<VecDeque<ChatReply>>>,
    last: Arc<Mutex<Option<ChatReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl SimulatedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        self.replies
            .lock()
            .expect("lock not poisoned")
            .push_back(ChatReply {
                text: text.into(),
                usage: TokenUsage {
                    input_tokens,
                    output_tokens,
                },
            });
        self
    }

    /// Requests seen so far, for assertions.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl ChatModel for SimulatedChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, SynthesisError> {
        self.requests
            .lock()
            .expect("lock not poisoned")
            .push(request.clone());
        let next = self.replies.lock().expect("lock not poisoned").pop_front();
        match next {
            Some(reply) => {
                *self.last.lock().expect("lock not poisoned") = Some(reply.clone());
                Ok(reply)
            }
            None => self
                .last
                .lock()
                .expect("lock not poisoned")
                .clone()
                .ok_or_else(|| SynthesisError::RequestFailed("no scripted reply".into())),
        }
    }
}

/// Transport that always fails, for error-path tests.
pub struct FailingChatModel;

#[async_trait]
impl ChatModel for FailingChatModel {
    async fn complete(&self, _request: &ChatRequest) -> Result<ChatReply, SynthesisError> {
        Err(SynthesisError::RequestFailed("simulated transport failure".into()))
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
