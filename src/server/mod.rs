//! HTTP surface of the local review service.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::review::ReviewRecord;
use crate::service::{
    ApiEnvelope, AskRequest, AskResponse, HealthStatus, ModelSummary, ReviewRequest,
    ReviewService, ServiceError,
};

const CORS_MAX_AGE_SECS: u64 = 86400;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Service(_) | ServerError::Bind { .. } | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ServerError::Service(e) => e.to_string(),
            other => other.to_string(),
        };
        (status, Json(ApiEnvelope::<()>::err(message))).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }
}

type AppState = Arc<ReviewService>;

async fn index_handler() -> Json<Value> {
    Json(json!({
        "message": "Zakkuri UX Reviewer API",
        "status": "running",
        "endpoints": [
            { "path": "/status", "method": "GET", "description": "サーバーの状態を取得" },
            { "path": "/review", "method": "POST", "description": "UXレビューを実行" },
            { "path": "/ask", "method": "POST", "description": "追加質問を送信" },
            { "path": "/models", "method": "GET", "description": "利用可能なモデルリストを取得" }
        ]
    }))
}

async fn status_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

async fn review_handler(
    State(service): State<AppState>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<ReviewRecord>>, ServerError> {
    let Json(request) = payload?;
    let layers = request.layer_info.into_nodes();
    let record = service
        .generate_review(&layers, request.model.as_deref())
        .await?;
    Ok(Json(ApiEnvelope::ok(record)))
}

async fn ask_handler(
    State(service): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<AskResponse>>, ServerError> {
    let Json(request) = payload?;
    let answer = service
        .generate_answer(&request.question, &request.context, request.model.as_deref())
        .await?;
    Ok(Json(ApiEnvelope::ok(AskResponse { answer })))
}

async fn models_handler(
    State(service): State<AppState>,
) -> Result<Json<ApiEnvelope<Vec<ModelSummary>>>, ServerError> {
    let models = service.list_models().await?;
    Ok(Json(ApiEnvelope::ok(models)))
}

async fn log_requests(
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() || status.is_client_error() {
        warn!("{} {} -> {} ({:?})", method, uri, status, started.elapsed());
    } else {
        info!("{} {} -> {} ({:?})", method, uri, status, started.elapsed());
    }
    response
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS))
}

/// Build the router with all routes and middleware.
pub fn router(service: Arc<ReviewService>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/review", post(review_handler))
        .route("/ask", post(ask_handler))
        .route("/models", get(models_handler))
        .with_state(service)
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    config: ServerConfig,
    service: Arc<ReviewService>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    let local_addr = listener.local_addr()?;
    info!("Review service listening on http://{}", local_addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Review service stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::provider::ModelProvider;

    /// A running service on an ephemeral port.
    pub struct TestServer {
        pub addr: SocketAddr,
        shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    }

    impl TestServer {
        pub async fn start(provider: Arc<dyn ModelProvider>) -> Self {
            let service = Arc::new(ReviewService::new(provider));
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

            tokio::spawn(async move {
                axum::serve(listener, router(service))
                    .with_graceful_shutdown(async {
                        shutdown_rx.await.ok();
                    })
                    .await
                    .ok();
            });

            Self {
                addr,
                shutdown_tx: Some(shutdown_tx),
            }
        }

        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}
