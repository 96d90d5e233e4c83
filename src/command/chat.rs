use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::plugin::{print_turns, PluginSession};
use crate::cli::ServiceArgs;
use crate::domain::selection::LayerNode;
use crate::domain::settings::SettingsStore;
use crate::ui::status::STATUS_POLL_INTERVAL;
use crate::ui::REVIEW_COMMAND;

/// Interactive conversation until EOF or `exit`.
pub async fn run_chat(
    store: &SettingsStore,
    selection: Option<PathBuf>,
    service: &ServiceArgs,
) -> Result<()> {
    let settings = service.apply(store.load());
    let session = PluginSession::start(settings, selection).await?;
    let _poller = session.ui.start_status_poller(STATUS_POLL_INTERVAL);

    print_selection(&session.ui.selection().await);
    println!("Model: {}", session.ui.settings().await.model);
    println!("Connected. Ask a question, type {} to review the selection, or exit to quit.\n", REVIEW_COMMAND);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = 0;
    let mut last_status = session.ui.connection_status().await;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        session.ui.send_message(line).await;
        shown = print_turns(&session.ui.turns().await, shown);

        let status = session.ui.connection_status().await;
        if status != last_status {
            println!("{}\n", status.label());
            last_status = status;
        }
    }

    session.shutdown().await;
    Ok(())
}

fn print_selection(layers: &[LayerNode]) {
    if layers.is_empty() {
        println!("No layers selected.");
        return;
    }

    println!("{} layer(s) selected:", layers.len());
    for node in layers {
        match node.characters() {
            Some(text) => println!("  - {} ({}) \"{}\"", node.name, node.node_type, text),
            None => println!("  - {} ({})", node.name, node.node_type),
        }
    }
}
