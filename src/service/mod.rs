//! Stateless review/ask core behind the HTTP surface.

pub mod types;

pub use types::{
    ApiEnvelope, AskContext, AskRequest, AskResponse, HealthStatus, LayerInfo, ModelSummary,
    ReviewRequest,
};

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::selection::LayerNode;
use crate::domain::settings::DEFAULT_MODEL;
use crate::provider::{CompletionRequest, ModelProvider};
use crate::review::prompt::{ANSWER_SYSTEM_PROMPT, REVIEW_SYSTEM_PROMPT};
use crate::review::{self, ReviewRecord};

pub const REVIEW_MAX_TOKENS: u32 = 4000;
pub const ANSWER_MAX_TOKENS: u32 = 2000;
pub const TEMPERATURE: f32 = 0.7;

pub const REVIEW_FAILED: &str = "レビューの生成に失敗しました";
pub const ANSWER_FAILED: &str = "回答の生成に失敗しました";
pub const MODELS_FAILED: &str = "モデルリストの取得に失敗しました";

/// Opaque failure surfaced to callers. Provider detail is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    GenerationFailed(&'static str),
}

pub struct ReviewService {
    provider: Arc<dyn ModelProvider>,
    default_model: String,
}

impl ReviewService {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self::with_default_model(provider, DEFAULT_MODEL)
    }

    pub fn with_default_model(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn resolve_model(&self, model: Option<&str>) -> String {
        model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string()
    }

    /// Critique the selection against the ten heuristics.
    pub async fn generate_review(
        &self,
        layers: &[LayerNode],
        model: Option<&str>,
    ) -> Result<ReviewRecord, ServiceError> {
        let model = self.resolve_model(model);
        let nodes: usize = layers.iter().map(LayerNode::node_count).sum();
        info!(
            "Generating review for {} layer(s), {} node(s) with {}",
            layers.len(),
            nodes,
            model
        );

        let prompt = review::build_review_prompt(layers).map_err(|e| {
            error!("Review prompt could not be built: {}", e);
            ServiceError::GenerationFailed(REVIEW_FAILED)
        })?;

        let request = CompletionRequest {
            model,
            system: REVIEW_SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: REVIEW_MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let text = self.provider.complete(request).await.map_err(|e| {
            error!("Review generation failed: {}", e);
            ServiceError::GenerationFailed(REVIEW_FAILED)
        })?;

        debug!("Review response: {} chars", text.chars().count());
        Ok(review::extract(&text))
    }

    /// Answer a follow-up question. The model text is returned as is.
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &AskContext,
        model: Option<&str>,
    ) -> Result<String, ServiceError> {
        let model = self.resolve_model(model);
        let history = context.chat_history.as_deref().unwrap_or_default();
        info!(
            "Generating answer with {} ({} history entries)",
            model,
            history.len()
        );

        let prompt = review::build_answer_prompt(question, context.review_result.as_ref(), history)
            .map_err(|e| {
                error!("Answer prompt could not be built: {}", e);
                ServiceError::GenerationFailed(ANSWER_FAILED)
            })?;

        let request = CompletionRequest {
            model,
            system: ANSWER_SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: ANSWER_MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        self.provider.complete(request).await.map_err(|e| {
            error!("Answer generation failed: {}", e);
            ServiceError::GenerationFailed(ANSWER_FAILED)
        })
    }

    /// The provider catalog, with the default model flagged.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>, ServiceError> {
        let models = self.provider.list_models().await.map_err(|e| {
            error!("Model catalog fetch failed: {}", e);
            ServiceError::GenerationFailed(MODELS_FAILED)
        })?;

        Ok(models
            .into_iter()
            .map(|m| ModelSummary {
                is_default: m.id == self.default_model,
                id: m.id,
                name: m.display_name,
                created_at: m.created_at,
            })
            .collect())
    }
}
