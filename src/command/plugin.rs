use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bridge::{channel, SandboxContext};
use crate::cli::JsonCanvas;
use crate::domain::conversation::{ConversationTurn, Role};
use crate::domain::settings::Settings;
use crate::ui::status::check;
use crate::ui::{ReviewBackend, ServiceClient, UiContext};

/// Sandbox and UI contexts wired together in-process.
pub struct PluginSession {
    pub ui: Arc<UiContext>,
    sandbox: JoinHandle<()>,
    ui_loop: JoinHandle<()>,
}

impl PluginSession {
    /// Validate settings, check the service, then start both contexts.
    pub async fn start(settings: Settings, selection: Option<PathBuf>) -> Result<Self> {
        let errors = settings.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("{}", messages.join("\n"));
        }

        let base_url = settings.service_base_url();
        let client = ServiceClient::new(&base_url)
            .with_context(|| format!("Invalid review service address: {}", base_url))?;
        let backend: Arc<dyn ReviewBackend> = Arc::new(client);

        let status = check(backend.as_ref()).await;
        if !status.is_connected() {
            bail!("{}\nStart it with 'zakkuri serve'.", status.label());
        }
        debug!("Connected to review service at {}", base_url);

        let canvas = Arc::new(JsonCanvas::new(selection));
        let file = canvas.file_identity();

        let (sandbox_port, ui_port) = channel();
        let (sandbox_tx, sandbox_rx) = sandbox_port.split();
        let (ui_tx, ui_rx) = ui_port.split();
        // The selection file is re-read on every snapshot, so no change feed.
        let (_, changes_rx) = mpsc::unbounded_channel();

        let sandbox = tokio::spawn(SandboxContext::new(canvas, sandbox_tx).run(sandbox_rx, changes_rx));

        let ui = Arc::new(UiContext::new(backend, ui_tx, settings, file));
        let ui_loop = ui.spawn_receiver(ui_rx);

        if let Err(e) = ui.request_selection().await {
            warn!("Could not read the selection: {}", e);
        }

        if let Err(e) = ui.refresh_models().await {
            warn!("Could not load model list: {}", e);
        }

        Ok(Self {
            ui,
            sandbox,
            ui_loop,
        })
    }

    pub async fn shutdown(self) {
        self.ui_loop.abort();
        self.sandbox.abort();
    }
}

/// Print assistant turns from index `from` on and return the new length.
pub fn print_turns(turns: &[ConversationTurn], from: usize) -> usize {
    for turn in turns.iter().skip(from) {
        if turn.role == Role::Assistant {
            println!("{}\n", turn.content);
        }
    }
    turns.len()
}
