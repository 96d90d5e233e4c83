//! The sandboxed plugin context: owns the canvas and answers the UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::message::{Envelope, PluginMessage, SELECTION_FAILED};
use super::router::{BridgeError, PortReceiver, PortSender, DEFAULT_REQUEST_TIMEOUT};
use crate::domain::selection::LayerNode;

const FILE_URL_BASE: &str = "https://www.figma.com/file";
const UNKNOWN_FILE_ID: &str = "unknown";
const UNKNOWN_FILE_NAME: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    #[error("{0}")]
    Unavailable(String),
}

/// The design-canvas object model, as far as this plugin needs it.
pub trait Canvas: Send + Sync + 'static {
    /// Snapshot of the currently selected nodes.
    fn selection(&self) -> Result<Vec<LayerNode>, CanvasError>;

    /// Resize the plugin window.
    fn resize(&self, width: u32, height: u32) -> Result<(), CanvasError>;
}

/// Identity of the open document, used to build node links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub file_id: String,
    pub file_name: String,
}

/// Deep link to a node. A missing identity yields the placeholder link.
pub fn node_url(identity: Option<&FileIdentity>, node_id: &str) -> String {
    let node_id = node_id.replace(':', "-");
    match identity {
        Some(identity) => {
            let name = urlencoding::encode(&identity.file_name).replace("%20", "-");
            format!(
                "{}/{}/{}?node-id={}",
                FILE_URL_BASE, identity.file_id, name, node_id
            )
        }
        None => format!(
            "{}/{}/{}?node-id={}",
            FILE_URL_BASE, UNKNOWN_FILE_ID, UNKNOWN_FILE_NAME, node_id
        ),
    }
}

/// File identity as learned from the UI, shared with the resolver task.
#[derive(Clone, Default)]
pub struct FileIdentityCache {
    identity: Arc<RwLock<Option<FileIdentity>>>,
    in_flight: Arc<AtomicBool>,
}

impl FileIdentityCache {
    pub fn get(&self) -> Option<FileIdentity> {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, identity: FileIdentity) {
        match self.identity.write() {
            Ok(mut guard) => *guard = Some(identity),
            Err(poisoned) => *poisoned.into_inner() = Some(identity),
        }
    }

    /// Cached identity, or ask the UI for it and wait.
    pub async fn resolve(
        &self,
        sender: &PortSender,
        node_id: Option<String>,
        timeout: Duration,
    ) -> Result<FileIdentity, BridgeError> {
        if let Some(identity) = self.get() {
            return Ok(identity);
        }

        let reply = sender
            .request(PluginMessage::GetFileId { node_id }, timeout)
            .await?;

        match reply.message {
            PluginMessage::FileUrlInfo {
                file_id, file_name, ..
            } => {
                let identity = FileIdentity { file_id, file_name };
                self.set(identity.clone());
                Ok(identity)
            }
            other => Err(BridgeError::UnexpectedReply {
                expected: "FILE_URL_INFO",
                got: other.kind(),
            }),
        }
    }

    /// Claim the single outstanding lookup. False if one is already running.
    fn begin_lookup(&self) -> bool {
        !self.in_flight.swap(true, Ordering::SeqCst)
    }

    fn end_lookup(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

fn annotate_urls(nodes: &mut [LayerNode], identity: Option<&FileIdentity>) {
    for node in nodes {
        node.url = Some(node_url(identity, &node.id));
        annotate_urls(&mut node.children, identity);
    }
}

/// Event loop of the sandboxed context.
pub struct SandboxContext<C: Canvas> {
    canvas: Arc<C>,
    sender: PortSender,
    files: FileIdentityCache,
    request_timeout: Duration,
}

impl<C: Canvas> SandboxContext<C> {
    pub fn new(canvas: Arc<C>, sender: PortSender) -> Self {
        Self {
            canvas,
            sender,
            files: FileIdentityCache::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Run until the UI goes away.
    ///
    /// Each `()` on `selection_changes` re-publishes the selection.
    pub async fn run(
        self,
        mut receiver: PortReceiver,
        mut selection_changes: mpsc::UnboundedReceiver<()>,
    ) {
        let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel::<()>();
        let mut changes_open = true;

        info!("Sandbox context started");
        self.publish_selection(None, &refresh_tx);

        loop {
            tokio::select! {
                incoming = receiver.recv() => {
                    let Some(envelope) = incoming else {
                        break;
                    };
                    self.handle(envelope, &refresh_tx);
                }
                change = selection_changes.recv(), if changes_open => {
                    match change {
                        Some(()) => self.publish_selection(None, &refresh_tx),
                        None => changes_open = false,
                    }
                }
                Some(()) = refresh_rx.recv() => {
                    self.publish_selection(None, &refresh_tx);
                }
            }
        }

        info!("Sandbox context stopped");
    }

    fn handle(&self, envelope: Envelope, refresh_tx: &mpsc::UnboundedSender<()>) {
        debug!("Sandbox received {}", envelope.message.kind());

        match &envelope.message {
            PluginMessage::RequestSelection => {
                self.publish_selection(Some(&envelope), refresh_tx);
            }
            PluginMessage::StartReview => {
                let reply = match self.snapshot(refresh_tx) {
                    Ok(layers) => PluginMessage::ReviewLayers { layers },
                    Err(e) => PluginMessage::ReviewLayersError {
                        message: error_message(&e),
                    },
                };
                self.sender.reply(&envelope, reply);
            }
            PluginMessage::ResizeWindow { width, height } => {
                if let Err(e) = self.canvas.resize(*width, *height) {
                    warn!("Resize to {}x{} failed: {}", width, height, e);
                }
            }
            PluginMessage::SendMessage { .. } => {
                self.sender
                    .reply(&envelope, PluginMessage::acknowledge(envelope.message.kind()));
            }
            PluginMessage::FileUrlInfo {
                file_id, file_name, ..
            } => {
                // Unsolicited identity push.
                self.files.set(FileIdentity {
                    file_id: file_id.clone(),
                    file_name: file_name.clone(),
                });
            }
            other => debug!("Sandbox ignoring {}", other.kind()),
        }
    }

    fn publish_selection(&self, request: Option<&Envelope>, refresh_tx: &mpsc::UnboundedSender<()>) {
        let message = match self.snapshot(refresh_tx) {
            Ok(layers) => PluginMessage::SelectedLayers { layers },
            Err(e) => PluginMessage::SelectedLayersError {
                message: error_message(&e),
            },
        };

        match request {
            Some(request) => self.sender.reply(request, message),
            None => self.sender.post(message),
        };
    }

    /// Selection with node links attached.
    ///
    /// Without a known file identity the links are placeholders and a lookup
    /// is started. Once it lands the selection is published again.
    fn snapshot(&self, refresh_tx: &mpsc::UnboundedSender<()>) -> Result<Vec<LayerNode>, CanvasError> {
        let mut layers = self.canvas.selection()?;
        let identity = self.files.get();

        if identity.is_none() {
            let first_node = layers.first().map(|n| n.id.replace(':', "-"));
            self.spawn_identity_lookup(first_node, refresh_tx.clone());
        }

        annotate_urls(&mut layers, identity.as_ref());
        Ok(layers)
    }

    fn spawn_identity_lookup(&self, node_id: Option<String>, refresh_tx: mpsc::UnboundedSender<()>) {
        if !self.files.begin_lookup() {
            return;
        }

        let files = self.files.clone();
        let sender = self.sender.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            match files.resolve(&sender, node_id, timeout).await {
                Ok(identity) => {
                    debug!("File identity resolved: {}", identity.file_id);
                    let _ = refresh_tx.send(());
                }
                Err(e) => debug!("File identity lookup failed: {}", e),
            }
            files.end_lookup();
        });
    }
}

fn error_message(err: &CanvasError) -> String {
    let text = err.to_string();
    if text.trim().is_empty() {
        SELECTION_FAILED.to_string()
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Canvas with a settable selection.
    #[derive(Default)]
    pub struct FakeCanvas {
        pub selection: Mutex<Option<Vec<LayerNode>>>,
        pub sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl FakeCanvas {
        pub fn with_selection(layers: Vec<LayerNode>) -> Self {
            Self {
                selection: Mutex::new(Some(layers)),
                sizes: Mutex::new(Vec::new()),
            }
        }
    }

    impl Canvas for FakeCanvas {
        fn selection(&self) -> Result<Vec<LayerNode>, CanvasError> {
            self.selection
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CanvasError::Unavailable(String::new()))
        }

        fn resize(&self, width: u32, height: u32) -> Result<(), CanvasError> {
            self.sizes.lock().unwrap().push((width, height));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeCanvas;
    use super::*;
    use crate::bridge::router::channel;

    #[test]
    fn test_node_url_with_identity() {
        let identity = FileIdentity {
            file_id: "AbC123".to_string(),
            file_name: "My Design File".to_string(),
        };
        assert_eq!(
            node_url(Some(&identity), "12:34"),
            "https://www.figma.com/file/AbC123/My-Design-File?node-id=12-34"
        );
    }

    #[test]
    fn test_node_url_placeholder() {
        assert_eq!(
            node_url(None, "1:2"),
            "https://www.figma.com/file/unknown/Untitled?node-id=1-2"
        );
    }

    #[tokio::test]
    async fn test_start_publishes_selection_and_requests_identity() {
        let canvas = Arc::new(FakeCanvas::with_selection(vec![LayerNode::text(
            "1:2", "Label", "OK",
        )]));
        let (sandbox, ui) = channel();
        let (sandbox_tx, sandbox_rx) = sandbox.split();
        let (ui_tx, mut ui_rx) = ui.split();
        let (_changes_tx, changes_rx) = mpsc::unbounded_channel();

        tokio::spawn(SandboxContext::new(canvas, sandbox_tx).run(sandbox_rx, changes_rx));

        // Initial push carries placeholder links.
        let first = ui_rx.recv().await.unwrap();
        match first.message {
            PluginMessage::SelectedLayers { layers } => {
                assert_eq!(
                    layers[0].url.as_deref(),
                    Some("https://www.figma.com/file/unknown/Untitled?node-id=1-2")
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }

        // Then the identity lookup.
        let lookup = ui_rx.recv().await.unwrap();
        assert!(matches!(lookup.message, PluginMessage::GetFileId { .. }));
        assert!(lookup.correlation_id.is_some());
        ui_tx.reply(
            &lookup,
            PluginMessage::FileUrlInfo {
                file_id: "F1".to_string(),
                file_name: "Demo File".to_string(),
                node_id: None,
            },
        );

        // Once resolved the selection is re-published with real links.
        let refreshed = ui_rx.recv().await.unwrap();
        match refreshed.message {
            PluginMessage::SelectedLayers { layers } => {
                assert_eq!(
                    layers[0].url.as_deref(),
                    Some("https://www.figma.com/file/F1/Demo-File?node-id=1-2")
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_review_replies_with_layers() {
        let canvas = Arc::new(FakeCanvas::with_selection(vec![LayerNode::text(
            "1:2", "Label", "OK",
        )]));
        let (sandbox, ui) = channel();
        let (sandbox_tx, sandbox_rx) = sandbox.split();
        let (ui_tx, mut ui_rx) = ui.split();
        let (_changes_tx, changes_rx) = mpsc::unbounded_channel();

        let context = SandboxContext::new(canvas, sandbox_tx);
        context.files.set(FileIdentity {
            file_id: "F1".to_string(),
            file_name: "Demo".to_string(),
        });
        tokio::spawn(context.run(sandbox_rx, changes_rx));

        let request_task = {
            let ui_tx = ui_tx.clone();
            tokio::spawn(async move {
                ui_tx
                    .request(PluginMessage::StartReview, Duration::from_secs(2))
                    .await
            })
        };

        // Drain uncorrelated traffic while the request is in flight.
        let drain = tokio::spawn(async move { while ui_rx.recv().await.is_some() {} });

        let reply = request_task.await.unwrap().unwrap();
        match reply.message {
            PluginMessage::ReviewLayers { layers } => {
                assert_eq!(layers.len(), 1);
                assert_eq!(layers[0].characters(), Some("OK"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        drain.abort();
    }

    #[tokio::test]
    async fn test_canvas_failure_yields_error_message() {
        let canvas = Arc::new(FakeCanvas::default());
        let (sandbox, ui) = channel();
        let (sandbox_tx, sandbox_rx) = sandbox.split();
        let (_ui_tx, mut ui_rx) = ui.split();
        let (_changes_tx, changes_rx) = mpsc::unbounded_channel();

        tokio::spawn(SandboxContext::new(canvas, sandbox_tx).run(sandbox_rx, changes_rx));

        let first = ui_rx.recv().await.unwrap();
        assert_eq!(
            first.message,
            PluginMessage::SelectedLayersError {
                message: SELECTION_FAILED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_resize_and_send_message() {
        let canvas = Arc::new(FakeCanvas::with_selection(vec![]));
        let (sandbox, ui) = channel();
        let (sandbox_tx, sandbox_rx) = sandbox.split();
        let (ui_tx, mut ui_rx) = ui.split();
        let (_changes_tx, changes_rx) = mpsc::unbounded_channel();

        let context = SandboxContext::new(canvas.clone(), sandbox_tx);
        context.files.set(FileIdentity {
            file_id: "F1".to_string(),
            file_name: "Demo".to_string(),
        });
        tokio::spawn(context.run(sandbox_rx, changes_rx));

        // Initial (empty) selection.
        let first = ui_rx.recv().await.unwrap();
        assert_eq!(first.message, PluginMessage::SelectedLayers { layers: vec![] });

        ui_tx.post(PluginMessage::ResizeWindow {
            width: 500,
            height: 700,
        });
        ui_tx.post(PluginMessage::SendMessage {
            message: "hello".to_string(),
        });

        let ack = ui_rx.recv().await.unwrap();
        match ack.message {
            PluginMessage::Debug {
                original_type,
                message,
                ..
            } => {
                assert_eq!(original_type, "SEND_MESSAGE");
                assert_eq!(message, crate::bridge::message::MESSAGE_RECEIVED);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        // Messages are handled in order, so the resize has happened.
        assert_eq!(canvas.sizes.lock().unwrap().as_slice(), &[(500, 700)]);
    }
}
