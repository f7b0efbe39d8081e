//! Chat-completion collaborator: wire types and the client seam.
//!
//! The endpoint is treated as unreliable. Callers bound every request with a
//! timeout inside the client and always keep a local fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// A single user message with plain text content.
    pub fn user_text(text: impl Into<String>, max_tokens: u32) -> Self {
        ChatRequest {
            model: None,
            messages: vec![ChatMessage::user(MessageContent::Text(text.into()))],
            max_tokens,
            temperature: 0.1,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Trimmed text of the first choice.
    pub fn first_reply(&self) -> Result<String, CollaboratorError> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .map(|message| message.content.trim().to_string())
            .ok_or_else(|| CollaboratorError::MalformedReply("no choices in reply".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    Transport(String),
    Timeout(u32),
    Status(u16),
    MalformedReply(String),
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::Transport(msg) => write!(f, "request failed: {}", msg),
            CollaboratorError::Timeout(ms) => write!(f, "request timed out after {}ms", ms),
            CollaboratorError::Status(code) => write!(f, "endpoint answered with status {}", code),
            CollaboratorError::MalformedReply(msg) => write!(f, "malformed reply: {}", msg),
        }
    }
}

impl std::error::Error for CollaboratorError {}

/// A chat-completion endpoint.
///
/// Implementations enforce their own timeout and return the reply text of the
/// first choice.
#[allow(async_fn_in_trait)]
pub trait ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CollaboratorError>;

    /// Wait between attempts. Clients without a timer return immediately.
    async fn pause(&self, _ms: u32) {}
}

/// Remove Markdown code fences a model may wrap around a JSON answer.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
