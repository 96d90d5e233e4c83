//! Plugin-side settings and their on-disk store.
//!
//! Settings live in `~/.zakkuri/settings.json` (or a custom config directory).
//! A missing or unreadable file is not an error: every consumer falls back to
//! [`Settings::default`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SERVER_URL: &str = "localhost";
pub const DEFAULT_PORT: u32 = 3000;
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

const SETTINGS_FILE: &str = "settings.json";

/// User-editable connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Kept for file compatibility. The service owns the provider credential.
    pub api_key: String,
    pub server_url: String,
    pub port: u32,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// Field checks in display order: host, port, model.
    pub fn validate(&self) -> Vec<SettingsError> {
        let mut errors = Vec::new();

        if self.server_url.trim().is_empty() {
            errors.push(SettingsError::MissingServerUrl);
        }
        if self.port == 0 || self.port > 65535 {
            errors.push(SettingsError::InvalidPort);
        }
        if self.model.trim().is_empty() {
            errors.push(SettingsError::MissingModel);
        }

        errors
    }

    /// Base URL of the local review service, e.g. `http://localhost:3000`.
    pub fn service_base_url(&self) -> String {
        let host = if self.server_url.trim().is_empty() {
            DEFAULT_SERVER_URL
        } else {
            self.server_url.trim()
        };
        let port = if self.port == 0 { DEFAULT_PORT } else { self.port };

        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host.trim_end_matches('/'), port)
        } else {
            format!("http://{}:{}", host, port)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("サーバーURLが設定されていません")]
    MissingServerUrl,
    #[error("ポート番号が無効です")]
    InvalidPort,
    #[error("モデルが選択されていません")]
    MissingModel,
}

/// Returned by [`SettingsStore::save`] when validation blocks the write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct InvalidSettings(pub Vec<SettingsError>);

impl fmt::Display for InvalidSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("\n"))
    }
}

/// JSON file store for [`Settings`].
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    /// Create a store rooted at `config_dir`, defaulting to `~/.zakkuri`.
    pub fn new(config_dir: Option<PathBuf>) -> Result<Self> {
        let base_dir = match config_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".zakkuri"),
        };

        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", base_dir))?;

        Ok(Self {
            settings_path: base_dir.join(SETTINGS_FILE),
        })
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Stored settings, or defaults when nothing usable is on disk.
    pub fn load(&self) -> Settings {
        if !self.settings_path.exists() {
            return Settings::default();
        }

        let content = match std::fs::read_to_string(&self.settings_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read settings file: {}", e);
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to parse settings JSON, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    /// Validate and persist. Nothing is written if validation fails.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let errors = settings.validate();
        if !errors.is_empty() {
            return Err(InvalidSettings(errors).into());
        }

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        std::fs::write(&self.settings_path, content)
            .with_context(|| format!("Failed to write settings file: {:?}", self.settings_path))?;

        info!("Settings saved");
        debug!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Remove the stored settings so the defaults apply again.
    pub fn clear(&self) -> Result<()> {
        if self.settings_path.exists() {
            std::fs::remove_file(&self.settings_path).with_context(|| {
                format!("Failed to remove settings file: {:?}", self.settings_path)
            })?;
        }

        info!("Settings cleared");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_reports_errors_in_field_order() {
        let settings = Settings {
            api_key: String::new(),
            server_url: String::new(),
            port: 0,
            model: String::new(),
        };

        let errors = settings.validate();
        assert_eq!(
            errors,
            vec![
                SettingsError::MissingServerUrl,
                SettingsError::InvalidPort,
                SettingsError::MissingModel
            ]
        );
        assert_eq!(errors[0].to_string(), "サーバーURLが設定されていません");
    }

    #[test]
    fn test_validate_out_of_range_port_with_blank_fields() {
        let settings = Settings {
            api_key: String::new(),
            server_url: String::new(),
            port: 70000,
            model: String::new(),
        };

        let messages: Vec<String> = settings.validate().iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "サーバーURLが設定されていません",
                "ポート番号が無効です",
                "モデルが選択されていません",
            ]
        );
    }

    #[test]
    fn test_port_upper_bound() {
        let mut settings = Settings::default();
        settings.port = 65535;
        assert!(settings.validate().is_empty());
        settings.port = 65536;
        assert_eq!(settings.validate(), vec![SettingsError::InvalidPort]);
    }

    #[test]
    fn test_load_without_file_returns_defaults() {
        let tmp = tempdir().unwrap();
        let store = SettingsStore::new(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let store = SettingsStore::new(Some(tmp.path().to_path_buf())).unwrap();

        let settings = Settings {
            port: 4000,
            model: "claude-3-5-sonnet-20241022".to_string(),
            ..Settings::default()
        };
        store.save(&settings).unwrap();

        assert_eq!(store.load(), settings);
        let raw = std::fs::read_to_string(store.settings_path()).unwrap();
        assert!(raw.contains("\"serverUrl\""));
    }

    #[test]
    fn test_invalid_settings_are_not_written() {
        let tmp = tempdir().unwrap();
        let store = SettingsStore::new(Some(tmp.path().to_path_buf())).unwrap();

        let settings = Settings {
            port: 0,
            ..Settings::default()
        };
        let err = store.save(&settings).unwrap_err();
        let invalid = err.downcast_ref::<InvalidSettings>().unwrap();
        assert_eq!(invalid.0, vec![SettingsError::InvalidPort]);
        assert!(!store.settings_path().exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = tempdir().unwrap();
        let store = SettingsStore::new(Some(tmp.path().to_path_buf())).unwrap();
        std::fs::write(store.settings_path(), r#"{"port": 8080}"#).unwrap();

        let settings = store.load();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_clear_restores_defaults() {
        let tmp = tempdir().unwrap();
        let store = SettingsStore::new(Some(tmp.path().to_path_buf())).unwrap();
        store.save(&Settings::default()).unwrap();
        store.clear().unwrap();
        assert!(!store.settings_path().exists());
    }

    #[test]
    fn test_service_base_url() {
        assert_eq!(Settings::default().service_base_url(), "http://localhost:3000");
        let settings = Settings {
            server_url: "http://127.0.0.1/".to_string(),
            port: 8080,
            ..Settings::default()
        };
        assert_eq!(settings.service_base_url(), "http://127.0.0.1:8080");
    }
}
