use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::client::ReviewBackend;
use crate::domain::conversation::{ConnectionStatus, Conversation};

pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Periodic reachability check of the review service.
///
/// The first check runs immediately. The task stops when the poller is dropped.
pub struct StatusPoller {
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(
        backend: Arc<dyn ReviewBackend>,
        conversation: Arc<RwLock<Conversation>>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let status = check(backend.as_ref()).await;
                let label = status.label();
                if conversation.write().await.set_connection_status(status) {
                    info!("{}", label);
                }
            }
        });

        Self { handle }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One status probe.
pub async fn check(backend: &dyn ReviewBackend) -> ConnectionStatus {
    match backend.status().await {
        Ok(status) if status.status == "ok" => ConnectionStatus::Connected,
        Ok(status) => ConnectionStatus::Disconnected {
            reason: format!("status {}", status.status),
        },
        Err(e) => {
            debug!("Status check failed: {}", e);
            ConnectionStatus::Disconnected {
                reason: e.user_message(),
            }
        }
    }
}
