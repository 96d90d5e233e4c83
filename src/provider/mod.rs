//! Generative-model provider seam.
//!
//! The service only sees [`ModelProvider`]; [`AnthropicClient`] is the one
//! production implementation.

mod anthropic;
mod http;
mod types;

pub use anthropic::AnthropicClient;
pub use types::ProviderError;

use async_trait::async_trait;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One entry of the provider's model catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderModel {
    pub id: String,
    pub display_name: String,
    pub created_at: String,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run one completion and return the text of the first text block.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// The models available to the configured credential.
    async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError>;
}
