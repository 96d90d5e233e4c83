use anyhow::Result;

use crate::cli::{ServiceArgs, SettingsAction};
use crate::domain::settings::SettingsStore;

pub fn run_settings(store: &SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = store.load();
            println!("Settings file: {}", store.settings_path().display());
            println!("   Server URL: {}", settings.server_url);
            println!("   Port: {}", settings.port);
            println!("   Model: {}", settings.model);
        }
        SettingsAction::Set { values } => set(store, &values)?,
        SettingsAction::Reset => {
            store.clear()?;
            println!("✅ Settings reset to defaults.");
        }
    }

    Ok(())
}

fn set(store: &SettingsStore, values: &ServiceArgs) -> Result<()> {
    if values.is_empty() {
        println!("Nothing to change. Use --server-url, --port or --model.");
        return Ok(());
    }

    let settings = values.apply(store.load());
    store.save(&settings)?;
    println!("✅ 設定を保存しました");

    Ok(())
}
