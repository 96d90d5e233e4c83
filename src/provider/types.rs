//! Wire types for the Anthropic Messages API and the provider error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize)]
pub(super) struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub temperature: f32,
    pub messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct RequestMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(super) enum ResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    /// Text of the first `text` block, if any.
    pub fn first_text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| match block {
            ResponseContent::Text { text } => Some(text),
            ResponseContent::Other => None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Everything that can go wrong talking to the model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Authentication with the provider failed (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider response contained no text block")]
    NoTextBlock,

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Build a status error from a non-success response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| format!("{}: {}", envelope.error.kind, envelope.error.message))
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 | 403 => ProviderError::Unauthorized { status, message },
            _ => ProviderError::Status { status, message },
        }
    }
}
