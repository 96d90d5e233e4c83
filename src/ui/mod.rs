//! The plugin UI context.
//!
//! Holds the conversation, talks to the sandbox over Hop A and to the review
//! service over Hop B. User actions (`send_message`, `run_review`) and the
//! incoming-message loop run as separate tasks, so a request that waits on a
//! sandbox reply never blocks the loop that delivers it.

pub mod client;
pub mod status;

pub use client::{ClientError, ReviewBackend, ServiceClient};
pub use status::StatusPoller;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::router::DEFAULT_REQUEST_TIMEOUT;
use crate::bridge::{BridgeError, Envelope, FileIdentity, PluginMessage, PortReceiver, PortSender};
use crate::domain::conversation::{ConnectionStatus, Conversation, ConversationTurn};
use crate::domain::selection::LayerNode;
use crate::domain::settings::Settings;
use crate::review::{format_review_markdown, ReviewRecord};
use crate::service::{AskContext, ModelSummary};

/// Chat input that triggers a review instead of a question.
pub const REVIEW_COMMAND: &str = "#review";

pub const NO_SELECTION_NOTICE: &str =
    "レイヤーが選択されていません。レビューするレイヤーを選択してください。";
pub const REVIEW_IN_PROGRESS: &str = "選択されたレイヤーのUXレビューを実行しています...";

fn error_turn(message: &str) -> ConversationTurn {
    ConversationTurn::assistant(format!("エラーが発生しました: {}", message))
}

fn debug_turn(message: &str) -> ConversationTurn {
    ConversationTurn::assistant(format!("[デバッグ] {}", message))
}

/// Pick the model to use from a freshly fetched catalog.
///
/// Keeps `current` when the catalog has it, otherwise prefers the entry flagged
/// as default, then the first entry.
pub fn select_model(current: &str, models: &[ModelSummary]) -> Option<String> {
    if models.iter().any(|m| m.id == current) {
        return Some(current.to_string());
    }
    models
        .iter()
        .find(|m| m.is_default)
        .or_else(|| models.first())
        .map(|m| m.id.clone())
}

pub struct UiContext {
    backend: Arc<dyn ReviewBackend>,
    sender: PortSender,
    conversation: Arc<RwLock<Conversation>>,
    selection: RwLock<Vec<LayerNode>>,
    last_review: RwLock<Option<ReviewRecord>>,
    settings: RwLock<Settings>,
    file: FileIdentity,
    request_timeout: Duration,
}

impl UiContext {
    pub fn new(
        backend: Arc<dyn ReviewBackend>,
        sender: PortSender,
        settings: Settings,
        file: FileIdentity,
    ) -> Self {
        Self {
            backend,
            sender,
            conversation: Arc::new(RwLock::new(Conversation::new())),
            selection: RwLock::new(Vec::new()),
            last_review: RwLock::new(None),
            settings: RwLock::new(settings),
            file,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Snapshot of the turns so far.
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.conversation.read().await.turns().to_vec()
    }

    /// Selection as last reported by the sandbox.
    pub async fn selection(&self) -> Vec<LayerNode> {
        self.selection.read().await.clone()
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        self.conversation.read().await.connection_status().clone()
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub fn start_status_poller(&self, interval: Duration) -> StatusPoller {
        StatusPoller::spawn(self.backend.clone(), self.conversation.clone(), interval)
    }

    /// Spawn the loop that handles messages from the sandbox.
    pub fn spawn_receiver(self: &Arc<Self>, mut receiver: PortReceiver) -> JoinHandle<()> {
        let ui = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                ui.handle_message(envelope).await;
            }
            debug!("UI receive loop ended");
        })
    }

    /// Ask the sandbox for the current selection and store the reply.
    ///
    /// Run when the UI starts: pushes sent before its receive loop was
    /// polling are never replayed.
    pub async fn request_selection(&self) -> Result<Vec<LayerNode>, BridgeError> {
        let reply = self
            .sender
            .request(PluginMessage::RequestSelection, self.request_timeout)
            .await?;

        let layers = match reply.message {
            PluginMessage::SelectedLayers { layers } => layers,
            PluginMessage::SelectedLayersError { message } => {
                warn!("Selection unavailable: {}", message);
                Vec::new()
            }
            other => {
                return Err(BridgeError::UnexpectedReply {
                    expected: "SELECTED_LAYERS",
                    got: other.kind(),
                })
            }
        };

        debug!("Selection on start: {} layer(s)", layers.len());
        *self.selection.write().await = layers.clone();
        Ok(layers)
    }

    async fn append(&self, turn: ConversationTurn) {
        self.conversation.write().await.append(turn);
    }

    /// React to one uncorrelated message from the sandbox.
    pub async fn handle_message(&self, envelope: Envelope) {
        match &envelope.message {
            PluginMessage::SelectedLayers { layers } => {
                debug!("Selection updated: {} layer(s)", layers.len());
                *self.selection.write().await = layers.clone();
            }
            PluginMessage::SelectedLayersError { message } => {
                warn!("Selection unavailable: {}", message);
                self.selection.write().await.clear();
            }
            PluginMessage::ReviewLayers { layers } => {
                self.review_layers(layers.clone()).await;
            }
            PluginMessage::ReviewLayersError { message } => {
                self.append(error_turn(message)).await;
            }
            PluginMessage::Debug { message, .. } => {
                self.append(debug_turn(message)).await;
            }
            PluginMessage::GetFileId { node_id } => {
                self.sender.reply(
                    &envelope,
                    PluginMessage::FileUrlInfo {
                        file_id: self.file.file_id.clone(),
                        file_name: self.file.file_name.clone(),
                        node_id: node_id.clone(),
                    },
                );
            }
            other => debug!("UI ignoring {}", other.kind()),
        }
    }

    /// Handle text typed into the chat input.
    pub async fn send_message(&self, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        if content == REVIEW_COMMAND {
            self.append(ConversationTurn::user(content)).await;
            self.run_review().await;
        } else {
            self.ask(content).await;
        }
    }

    /// Ask a follow-up question.
    ///
    /// The answer is appended whenever it arrives, so overlapping asks land in
    /// resolution order.
    pub async fn ask(&self, question: &str) {
        let history = self.conversation.read().await.history();
        self.append(ConversationTurn::user(question)).await;

        self.sender.post(PluginMessage::SendMessage {
            message: question.to_string(),
        });

        let context = AskContext {
            review_result: self.last_review.read().await.clone(),
            chat_history: Some(history),
        };
        let model = self.settings.read().await.model.clone();

        match self.backend.ask(question, context, Some(&model)).await {
            Ok(answer) => self.append(ConversationTurn::assistant(answer)).await,
            Err(e) => {
                warn!("Ask failed: {}", e);
                self.append(error_turn(&e.user_message())).await;
            }
        }
    }

    /// Fetch the current selection from the sandbox and review it.
    pub async fn run_review(&self) {
        let reply = self
            .sender
            .request(PluginMessage::StartReview, self.request_timeout)
            .await;

        let result = reply.and_then(|envelope| match envelope.message {
            PluginMessage::ReviewLayers { layers } => Ok(Ok(layers)),
            PluginMessage::ReviewLayersError { message } => Ok(Err(message)),
            other => Err(BridgeError::UnexpectedReply {
                expected: "REVIEW_LAYERS",
                got: other.kind(),
            }),
        });

        match result {
            Ok(Ok(layers)) => self.review_layers(layers).await,
            Ok(Err(message)) => self.append(error_turn(&message)).await,
            Err(e) => {
                warn!("Could not obtain selection for review: {}", e);
                self.append(error_turn(&e.to_string())).await;
            }
        }
    }

    async fn review_layers(&self, layers: Vec<LayerNode>) {
        if layers.is_empty() {
            self.append(ConversationTurn::assistant(NO_SELECTION_NOTICE))
                .await;
            return;
        }

        info!("Requesting review of {} layer(s)", layers.len());
        self.append(ConversationTurn::assistant(REVIEW_IN_PROGRESS))
            .await;

        let model = self.settings.read().await.model.clone();
        match self.backend.review(&layers, Some(&model)).await {
            Ok(record) => {
                let markdown = format_review_markdown(&record);
                *self.last_review.write().await = Some(record);
                self.append(ConversationTurn::assistant(markdown)).await;
            }
            Err(e) => {
                warn!("Review failed: {}", e);
                self.append(error_turn(&e.user_message())).await;
            }
        }
    }

    /// Fetch the model catalog and reconcile the selected model with it.
    pub async fn refresh_models(&self) -> Result<Vec<ModelSummary>, ClientError> {
        let models = self.backend.models().await?;

        let mut settings = self.settings.write().await;
        if let Some(model) = select_model(&settings.model, &models) {
            if model != settings.model {
                info!("Model {} unavailable, using {}", settings.model, model);
                settings.model = model;
            }
        }

        Ok(models)
    }
}
