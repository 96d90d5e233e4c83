use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::domain::settings::Settings;

/// Zakkuri - heuristic UX reviews for design selections
#[derive(Parser)]
#[command(name = "zakkuri")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding settings.json. Defaults to ~/.zakkuri
    #[arg(long, global = true, env = "ZAKKURI_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the local review service
    Serve {
        /// Generative model provider API key
        #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Model used when a request names none
        #[arg(short, long)]
        model: Option<String>,

        /// Custom provider base URL (for debugging/dev deployments only)
        #[arg(long, hide = true)]
        provider_url: Option<String>,
    },
    /// Review the layers in a selection file
    Review {
        /// JSON file with the selected layers (a list or a single node)
        #[arg(short, long)]
        selection: PathBuf,

        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Chat with the reviewer. Type #review to review the selection
    Chat {
        /// JSON file with the selected layers
        #[arg(short, long)]
        selection: Option<PathBuf>,

        #[command(flatten)]
        service: ServiceArgs,
    },
    /// List models offered by the review service
    Models {
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Check the review service connection
    Status {
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the stored settings
    Show,
    /// Update stored settings
    Set {
        #[command(flatten)]
        values: ServiceArgs,
    },
    /// Restore the defaults
    Reset,
}

/// Per-invocation overrides of the stored settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Review service host
    #[arg(long)]
    pub server_url: Option<String>,

    /// Review service port
    #[arg(long)]
    pub port: Option<u32>,

    /// Model to request
    #[arg(short, long)]
    pub model: Option<String>,
}

impl ServiceArgs {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(server_url) = &self.server_url {
            settings.server_url = server_url.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        settings
    }

    pub fn is_empty(&self) -> bool {
        self.server_url.is_none() && self.port.is_none() && self.model.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_only_given_fields() {
        let args = ServiceArgs {
            port: Some(4000),
            ..Default::default()
        };
        let settings = args.apply(Settings::default());
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.server_url, "localhost");
        assert!(!args.is_empty());
        assert!(ServiceArgs::default().is_empty());
    }

    #[test]
    fn test_parse_review_command() {
        let cli = Cli::try_parse_from([
            "zakkuri",
            "review",
            "--selection",
            "layers.json",
            "--model",
            "claude-x",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Review { selection, service }) => {
                assert_eq!(selection, PathBuf::from("layers.json"));
                assert_eq!(service.model.as_deref(), Some("claude-x"));
            }
            _ => panic!("expected review command"),
        }
    }

    #[test]
    fn test_parse_settings_set() {
        let cli =
            Cli::try_parse_from(["zakkuri", "settings", "set", "--port", "8080"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Settings {
                action: SettingsAction::Set { ref values }
            }) if values.port == Some(8080)
        ));
    }
}
