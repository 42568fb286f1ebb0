//! [`LlmDriver`] – OpenAI-compatible chat-completion client.
//!
//! Talks to any server exposing `/v1/chat/completions` (OpenAI itself, or a
//! local gateway). Planners depend on the [`CompletionClient`] trait rather
//! than on the driver, so tests can script replies without a network.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use nao_runtime::llm_driver::{ChatMessage, CompletionClient, CompletionRequest, LlmDriver};
//!
//! # async fn demo() -> Result<(), nao_runtime::llm_driver::LlmError> {
//! let driver = LlmDriver::new(
//!     "https://api.openai.com",
//!     "gpt-3.5-turbo-16k",
//!     Some("sk-...".to_string()),
//!     Duration::from_secs(30),
//! )?;
//!
//! let request = CompletionRequest::new(vec![
//!     ChatMessage::system("You are a NAO robot."),
//!     ChatMessage::user("Say hello."),
//! ]);
//! let reply = driver.complete(&request).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use nao_types::NaoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from completion calls.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The HTTP request failed, timed out, or returned a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the model server could not be interpreted.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

impl From<LlmError> for NaoError {
    fn from(e: LlmError) -> Self {
        NaoError::LlmInferenceFailed(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// The role of a participant in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling knobs sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    /// Low temperature and narrow nucleus: plans should be predictable.
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1000,
            top_p: 0.4,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// An ordered message list plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub params: SamplingParams,
}

impl CompletionRequest {
    /// Request with the default [`SamplingParams`].
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            params: SamplingParams::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CompletionClient
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that turns a message list into reply text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the assistant's reply to `request`.
    ///
    /// # Errors
    ///
    /// [`LlmError`] when the call fails or the reply has no content.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(flatten)]
    params: SamplingParams,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmDriver
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once and reuse across conversation turns.
pub struct LlmDriver {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmDriver {
    /// Create a driver for `model` at `base_url`. Every request is bounded by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// [`LlmError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for LlmDriver {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            params: request.params,
        };

        debug!(model = %self.model, messages = request.messages.len(), "sending completion request");
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response: ChatResponse = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::BadResponse("empty choices array".into()))
    }
}
