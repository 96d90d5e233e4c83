//! Conversation log owned by the UI context.
//!
//! Turns are append-only. The connection status lives in its own slot so it
//! can be replaced without touching the ordered log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One exchanged message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Role/content pair sent to the service as conversational memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Reachability of the local review service as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Checking,
    Connected,
    Disconnected { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Status line shown above the chat.
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Checking => "サーバー接続状態: 確認中...".to_string(),
            ConnectionStatus::Connected => "サーバー接続状態: 接続済み".to_string(),
            ConnectionStatus::Disconnected { reason } => {
                format!("サーバー接続状態: 未接続 ({})", reason)
            }
        }
    }
}

/// Ordered turn log for one plugin session.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    connection: ConnectionStatus,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            connection: ConnectionStatus::Checking,
        }
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Snapshot of the log in the shape the answer prompt expects.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.turns.iter().map(HistoryEntry::from).collect()
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection
    }

    /// Replace the status slot. Returns true when the status changed.
    pub fn set_connection_status(&mut self, status: ConnectionStatus) -> bool {
        if self.connection == status {
            return false;
        }
        self.connection = status;
        true
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
