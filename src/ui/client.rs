//! Hop B: the UI's HTTP client for the local review service.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::domain::selection::LayerNode;
use crate::review::ReviewRecord;
use crate::service::{
    ApiEnvelope, AskContext, AskRequest, AskResponse, HealthStatus, LayerInfo, ModelSummary,
    ReviewRequest,
};

/// Shown in the conversation for anything other than a service-reported error.
pub const CONNECTION_FAILED: &str = "サーバーとの通信に失敗しました";

/// Review generation can take a while.
const REQUEST_TIMEOUT_SECS: u64 = 180;
const STATUS_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request to review service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Review service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// `success: false` with the service's own message.
    #[error("{0}")]
    Service(String),

    #[error("Review service response had no data")]
    MissingData,
}

impl ClientError {
    /// Text suitable for the conversation.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Service(message) => message.clone(),
            _ => CONNECTION_FAILED.to_string(),
        }
    }
}

/// What the UI needs from the review service.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn status(&self) -> Result<HealthStatus, ClientError>;

    async fn review(
        &self,
        layers: &[LayerNode],
        model: Option<&str>,
    ) -> Result<ReviewRecord, ClientError>;

    async fn ask(
        &self,
        question: &str,
        context: AskContext,
        model: Option<&str>,
    ) -> Result<String, ClientError>;

    async fn models(&self) -> Result<Vec<ModelSummary>, ClientError>;
}

pub struct ServiceClient {
    client: Client,
    base_url: Url,
}

impl ServiceClient {
    /// `base_url` is the service root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        // Error responses still carry the envelope when the service produced them.
        let envelope = match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                if status.is_success() {
                    error!("Undecodable service response: {}", e);
                }
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        };

        if !envelope.success {
            return Err(ClientError::Service(
                envelope
                    .error
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ));
        }

        envelope.data.ok_or(ClientError::MissingData)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::unwrap_envelope(response).await
    }
}

#[async_trait]
impl ReviewBackend for ServiceClient {
    async fn status(&self) -> Result<HealthStatus, ClientError> {
        let url = self.base_url.join("status")?;
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(STATUS_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    async fn review(
        &self,
        layers: &[LayerNode],
        model: Option<&str>,
    ) -> Result<ReviewRecord, ClientError> {
        let request = ReviewRequest {
            layer_info: LayerInfo::Many(layers.to_vec()),
            model: model.map(ToOwned::to_owned),
        };
        self.post("review", &request).await
    }

    async fn ask(
        &self,
        question: &str,
        context: AskContext,
        model: Option<&str>,
    ) -> Result<String, ClientError> {
        let request = AskRequest {
            question: question.to_string(),
            context,
            model: model.map(ToOwned::to_owned),
        };
        let response: AskResponse = self.post("ask", &request).await?;
        Ok(response.answer)
    }

    async fn models(&self) -> Result<Vec<ModelSummary>, ClientError> {
        let url = self.base_url.join("models")?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::unwrap_envelope(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::server::testing::TestServer;
    use crate::service::testing::ScriptedProvider;
    use crate::service::ANSWER_FAILED;
    use std::sync::Arc;

    fn client_for(server: &TestServer) -> ServiceClient {
        ServiceClient::new(&format!("http://{}", server.addr)).unwrap()
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let server = TestServer::start(Arc::new(ScriptedProvider::default())).await;
        let status = client_for(&server).status().await.unwrap();
        assert_eq!(status.status, "ok");
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let server = TestServer::start(Arc::new(ScriptedProvider::replying("回答"))).await;
        let answer = client_for(&server)
            .ask("質問", AskContext::default(), None)
            .await
            .unwrap();
        assert_eq!(answer, "回答");
    }

    #[tokio::test]
    async fn test_service_error_is_surfaced_verbatim() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::NoTextBlock)]));
        let server = TestServer::start(provider).await;

        let err = client_for(&server)
            .ask("質問", AskContext::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Service(ref m) if m == ANSWER_FAILED));
        assert_eq!(err.user_message(), ANSWER_FAILED);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_generic() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ServiceClient::new(&format!("http://{}", addr)).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.user_message(), CONNECTION_FAILED);
    }

    #[tokio::test]
    async fn test_models_round_trip() {
        let server = TestServer::start(Arc::new(ScriptedProvider::default())).await;
        let models = client_for(&server).models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert!(models.iter().any(|m| m.is_default));
    }
}
