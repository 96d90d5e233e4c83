use anyhow::{Context, Result};

use crate::cli::ServiceArgs;
use crate::domain::settings::SettingsStore;
use crate::ui::status::check;
use crate::ui::ServiceClient;

pub async fn run_status(store: &SettingsStore, service: &ServiceArgs) -> Result<()> {
    let settings = service.apply(store.load());
    let base_url = settings.service_base_url();
    let client = ServiceClient::new(&base_url)
        .with_context(|| format!("Invalid review service address: {}", base_url))?;

    let status = check(&client).await;
    if status.is_connected() {
        println!("✅ {}", status.label());
    } else {
        println!("❌ {}", status.label());
        println!("   Run 'zakkuri serve' to start the review service.");
    }
    println!("   Service URL: {}", base_url);
    println!("   Model: {}", settings.model);

    Ok(())
}
