use serde::{Deserialize, Serialize};

/// Role in a conversation
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

/// A single message in a conversation history.
///
/// Persisted with camelCase keys so existing browser storage keeps loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Generation time of an assistant reply
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_ms: Option<u64>,
    #[serde(default = "now_rfc3339")]
    pub created_at: String,
    /// True only while a live generation session is writing into this entry
    #[serde(skip_serializing_if = "is_false", default)]
    pub pending: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            elapsed_ms: None,
            created_at: now_rfc3339(),
            pending: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            elapsed_ms: None,
            created_at: now_rfc3339(),
            pending: false,
        }
    }

    /// An assistant entry under construction by a generation session.
    pub fn pending_assistant(text: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::assistant(text)
        }
    }

    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// The `{role, content}` pair sent to the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn is_false(value: &bool) -> bool {
    !*value
}
