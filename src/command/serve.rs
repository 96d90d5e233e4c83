use anyhow::{bail, Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

use crate::provider::AnthropicClient;
use crate::server::{serve_with_shutdown, ServerConfig};
use crate::service::ReviewService;

pub const MISSING_API_KEY: &str = "APIキーが指定されていません。";

pub async fn run_serve(
    api_key: Option<String>,
    bind: IpAddr,
    port: u16,
    model: Option<String>,
    provider_url: Option<String>,
) -> Result<()> {
    let api_key = match api_key.map(|k| k.trim().to_string()) {
        Some(key) if !key.is_empty() => key,
        _ => bail!(
            "{}\nSet ANTHROPIC_API_KEY or pass --api-key.",
            MISSING_API_KEY
        ),
    };

    let provider = AnthropicClient::new(api_key, provider_url.as_deref())
        .context("Failed to create provider client")?;

    let provider = Arc::new(provider);
    let service = match model {
        Some(model) => ReviewService::with_default_model(provider, model),
        None => ReviewService::new(provider),
    };
    info!("Default model: {}", service.default_model());

    let config = ServerConfig::new(SocketAddr::new(bind, port));
    serve_with_shutdown(config, Arc::new(service), async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
        }
    })
    .await?;

    Ok(())
}
