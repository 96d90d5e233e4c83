//! Hop A message vocabulary and envelope framing.
//!
//! On the wire every message is a flat JSON object tagged by `type`, with the
//! optional correlation fields alongside the payload:
//!
//! ```json
//! {"type":"GET_FILE_ID","nodeId":"1-2","correlationId":"9b0c..."}
//! {"type":"FILE_URL_INFO","fileId":"abc","fileName":"Demo","nodeId":"1-2","replyTo":"9b0c..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::selection::LayerNode;

/// Acknowledgement text echoed back for `SEND_MESSAGE`.
pub const MESSAGE_RECEIVED: &str = "メッセージを正常に受信しました";
/// Fallback when the canvas cannot describe the selection.
pub const SELECTION_FAILED: &str = "レイヤー情報の取得に失敗しました";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PluginMessage {
    /// Current selection, pushed on start and on every change.
    #[serde(rename = "SELECTED_LAYERS")]
    SelectedLayers { layers: Vec<LayerNode> },

    #[serde(rename = "SELECTED_LAYERS_ERROR")]
    SelectedLayersError { message: String },

    /// Ask the sandbox to push the selection again.
    #[serde(rename = "REQUEST_SELECTION")]
    RequestSelection,

    #[serde(rename = "START_REVIEW")]
    StartReview,

    /// Selection captured for a review request.
    #[serde(rename = "REVIEW_LAYERS")]
    ReviewLayers { layers: Vec<LayerNode> },

    #[serde(rename = "REVIEW_LAYERS_ERROR")]
    ReviewLayersError { message: String },

    #[serde(rename = "RESIZE_WINDOW")]
    ResizeWindow { width: u32, height: u32 },

    #[serde(rename = "SEND_MESSAGE")]
    SendMessage { message: String },

    #[serde(rename = "debug", rename_all = "camelCase")]
    Debug {
        original_type: String,
        timestamp: DateTime<Utc>,
        message: String,
    },

    /// Request for the document's file identity.
    #[serde(rename = "GET_FILE_ID", rename_all = "camelCase")]
    GetFileId {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    #[serde(rename = "FILE_URL_INFO", rename_all = "camelCase")]
    FileUrlInfo {
        file_id: String,
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    /// Any type this build does not know. Recipients ignore it.
    #[serde(other)]
    Unknown,
}

impl PluginMessage {
    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            PluginMessage::SelectedLayers { .. } => "SELECTED_LAYERS",
            PluginMessage::SelectedLayersError { .. } => "SELECTED_LAYERS_ERROR",
            PluginMessage::RequestSelection => "REQUEST_SELECTION",
            PluginMessage::StartReview => "START_REVIEW",
            PluginMessage::ReviewLayers { .. } => "REVIEW_LAYERS",
            PluginMessage::ReviewLayersError { .. } => "REVIEW_LAYERS_ERROR",
            PluginMessage::ResizeWindow { .. } => "RESIZE_WINDOW",
            PluginMessage::SendMessage { .. } => "SEND_MESSAGE",
            PluginMessage::Debug { .. } => "debug",
            PluginMessage::GetFileId { .. } => "GET_FILE_ID",
            PluginMessage::FileUrlInfo { .. } => "FILE_URL_INFO",
            PluginMessage::Unknown => "unknown",
        }
    }

    /// Debug acknowledgement for a received message.
    pub fn acknowledge(original_type: &str) -> Self {
        PluginMessage::Debug {
            original_type: original_type.to_string(),
            timestamp: Utc::now(),
            message: MESSAGE_RECEIVED.to_string(),
        }
    }
}

/// A message plus its correlation fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    #[serde(flatten)]
    pub message: PluginMessage,
}

impl Envelope {
    /// Fire-and-forget envelope with no correlation.
    pub fn new(message: PluginMessage) -> Self {
        Self {
            correlation_id: None,
            reply_to: None,
            message,
        }
    }

    /// Envelope that expects a reply.
    pub fn request(message: PluginMessage) -> Self {
        Self {
            correlation_id: Some(Uuid::new_v4()),
            reply_to: None,
            message,
        }
    }

    /// Reply to `request`, echoing its correlation id.
    pub fn reply(request: &Envelope, message: PluginMessage) -> Self {
        Self {
            correlation_id: None,
            reply_to: request.correlation_id,
            message,
        }
    }
}

impl From<PluginMessage> for Envelope {
    fn from(message: PluginMessage) -> Self {
        Envelope::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_is_flat_on_the_wire() {
        let envelope = Envelope::request(PluginMessage::GetFileId {
            node_id: Some("1-2".to_string()),
        });
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["type"], "GET_FILE_ID");
        assert_eq!(value["nodeId"], "1-2");
        assert!(value["correlationId"].is_string());
        assert!(value.get("replyTo").is_none());
    }

    #[test]
    fn test_reply_echoes_correlation_id() {
        let request = Envelope::request(PluginMessage::GetFileId { node_id: None });
        let reply = Envelope::reply(
            &request,
            PluginMessage::FileUrlInfo {
                file_id: "abc".to_string(),
                file_name: "Demo".to_string(),
                node_id: None,
            },
        );
        assert_eq!(reply.reply_to, request.correlation_id);

        let decoded: Envelope =
            serde_json::from_str(&serde_json::to_string(&reply).unwrap()).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_selected_layers_from_plugin_json() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "SELECTED_LAYERS",
            "layers": [{"id": "1:2", "name": "Button Label", "type": "TEXT", "characters": "Submit"}]
        }))
        .unwrap();

        match envelope.message {
            PluginMessage::SelectedLayers { layers } => {
                assert_eq!(layers[0].characters(), Some("Submit"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(envelope.correlation_id.is_none());
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let envelope: Envelope =
            serde_json::from_value(json!({"type": "message-received", "foo": 1})).unwrap();
        assert_eq!(envelope.message, PluginMessage::Unknown);
    }

    #[test]
    fn test_debug_uses_camel_case() {
        let value = serde_json::to_value(PluginMessage::acknowledge("SEND_MESSAGE")).unwrap();
        assert_eq!(value["type"], "debug");
        assert_eq!(value["originalType"], "SEND_MESSAGE");
        assert_eq!(value["message"], MESSAGE_RECEIVED);
    }
}
