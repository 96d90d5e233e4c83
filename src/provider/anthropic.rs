use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::http::{send_with_retry, RetryPolicy};
use super::types::{MessagesRequest, MessagesResponse, ModelsResponse, RequestMessage};
use super::{CompletionRequest, ModelProvider, ProviderError, ProviderModel};

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completions can take a while for long reviews.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Thin client over the Anthropic Messages and Models endpoints.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_base: Url,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, api_base: Option<&str>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base = api_base.unwrap_or(ANTHROPIC_API_BASE);
        // A trailing slash keeps any path prefix when joining endpoints.
        let api_base = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{}/", base))?
        };

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base,
            retry: RetryPolicy::default(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.api_base.join(path)?)
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::from_status(status, &body)
    }
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let url = self.endpoint("v1/messages")?;
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: Some(request.system.as_str()).filter(|s| !s.is_empty()),
            temperature: request.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        debug!(
            "Sending completion to {} (model {}, max_tokens {})",
            url, request.model, request.max_tokens
        );

        let response = send_with_retry(self.retry, || {
            self.client
                .post(url.clone())
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await?;

        if !response.status().is_success() {
            let err = Self::read_error(response).await;
            error!("Completion request failed: {}", err);
            return Err(err);
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        parsed.first_text().ok_or(ProviderError::NoTextBlock)
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError> {
        let url = self.endpoint("v1/models")?;
        debug!("Fetching model catalog from {}", url);

        let response = send_with_retry(self.retry, || {
            self.client
                .get(url.clone())
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
        })
        .await?;

        if !response.status().is_success() {
            let err = Self::read_error(response).await;
            error!("Model catalog request failed: {}", err);
            return Err(err);
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|entry| ProviderModel {
                display_name: entry.display_name.unwrap_or_else(|| entry.id.clone()),
                created_at: entry.created_at.unwrap_or_default(),
                id: entry.id,
            })
            .collect())
    }
}
