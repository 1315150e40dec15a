use serde::{Deserialize, Serialize};
use crate::message::{now_rfc3339, Message};

/// Canonical title of a conversation nobody has named yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default = "now_rfc3339")]
    pub created_at: String,
}

impl Conversation {
    pub fn new(id: String, title: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            avatar: avatar.into(),
            messages: Vec::new(),
            created_at: now_rfc3339(),
        }
    }

    /// Index of the entry a live session is writing into, if any.
    pub fn pending_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.pending)
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            avatar: self.avatar.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Summary of a conversation for the sidebar listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub avatar: String,
    pub message_count: usize,
    pub created_at: String,
}
