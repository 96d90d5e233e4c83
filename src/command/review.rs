use anyhow::Result;
use std::path::PathBuf;

use super::plugin::{print_turns, PluginSession};
use crate::cli::ServiceArgs;
use crate::domain::settings::SettingsStore;

/// Run one review of the layers in `selection` and print the result.
pub async fn run_review(store: &SettingsStore, selection: PathBuf, service: &ServiceArgs) -> Result<()> {
    let settings = service.apply(store.load());
    let session = PluginSession::start(settings, Some(selection)).await?;

    session.ui.run_review().await;
    print_turns(&session.ui.turns().await, 0);

    session.shutdown().await;
    Ok(())
}
