//! Plain data shared by every context: selection snapshots, the conversation
//! log and the plugin settings.

pub mod conversation;
pub mod selection;
pub mod settings;
