use anyhow::{Context, Result};

use crate::cli::ServiceArgs;
use crate::domain::settings::SettingsStore;
use crate::ui::{ReviewBackend, ServiceClient};

pub async fn run_models(store: &SettingsStore, service: &ServiceArgs) -> Result<()> {
    let settings = service.apply(store.load());
    let client = ServiceClient::new(&settings.service_base_url())?;

    let models = client
        .models()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to list models")?;

    if models.is_empty() {
        println!("No models available.");
        return Ok(());
    }

    for model in &models {
        let marker = if model.id == settings.model { "*" } else { " " };
        let default = if model.is_default { " (default)" } else { "" };
        println!("{} {} - {}{}", marker, model.id, model.name, default);
    }

    Ok(())
}
