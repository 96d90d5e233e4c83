//! Request and response bodies of the local review service.
//!
//! Shared by the HTTP surface and the UI-side client so both ends agree on
//! one typed contract.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::HistoryEntry;
use crate::domain::selection::LayerNode;
use crate::review::ReviewRecord;

/// Selection payload: a list of nodes, or a single node for older callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerInfo {
    Many(Vec<LayerNode>),
    One(Box<LayerNode>),
}

impl LayerInfo {
    pub fn into_nodes(self) -> Vec<LayerNode> {
        match self {
            LayerInfo::Many(nodes) => nodes,
            LayerInfo::One(node) => vec![*node],
        }
    }
}

impl From<Vec<LayerNode>> for LayerInfo {
    fn from(nodes: Vec<LayerNode>) -> Self {
        LayerInfo::Many(nodes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub layer_info: LayerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Prior review and conversation sent along with a follow-up question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_result: Option<ReviewRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub context: AskContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// One entry of the `/models` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub is_default: bool,
}

/// `{success, data?, error?}` wrapper used by every data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer_info_accepts_single_node() {
        let request: ReviewRequest = serde_json::from_value(json!({
            "layerInfo": {"id": "1:2", "name": "Label", "type": "TEXT", "characters": "OK"}
        }))
        .unwrap();
        let nodes = request.layer_info.into_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].characters(), Some("OK"));
    }

    #[test]
    fn test_ask_request_context_is_optional() {
        let request: AskRequest = serde_json::from_value(json!({"question": "q"})).unwrap();
        assert_eq!(request.context, AskContext::default());
        assert!(request.model.is_none());
    }

    #[test]
    fn test_envelope_omits_absent_fields() {
        let value = serde_json::to_value(ApiEnvelope::<()>::err("boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }

    fn decode_envelope<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> ApiEnvelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_decodes_without_data_for_any_payload() {
        let failed: ApiEnvelope<Vec<ModelSummary>> =
            decode_envelope(json!({"success": false, "error": "モデルリストの取得に失敗しました"}));
        assert!(failed.data.is_none());
        assert_eq!(failed.error.as_deref(), Some("モデルリストの取得に失敗しました"));

        let ok: ApiEnvelope<AskResponse> =
            decode_envelope(json!({"success": true, "data": {"answer": "はい"}}));
        assert_eq!(ok.data.unwrap().answer, "はい");
        assert!(ok.error.is_none());
    }
}
