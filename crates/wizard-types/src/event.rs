use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionOutcome;

/// Stage of a backend progress announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Init,
    Step,
    Complete,
}

impl ProgressStage {
    /// Map a payload `type` tag (`progress_init`, ...) to a stage.
    pub fn from_type(tag: &str) -> Option<Self> {
        match tag {
            "progress_init" => Some(ProgressStage::Init),
            "progress_step" => Some(ProgressStage::Step),
            "progress_complete" => Some(ProgressStage::Complete),
            _ => None,
        }
    }
}

/// A typed protocol event decoded from the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text; `done` marks the final chunk
    Chunk { text: String, done: bool },
    /// Backend progress notice, payload kept verbatim
    Progress { stage: ProgressStage, payload: Value },
    /// Explicit protocol error frame. Fatal to the session.
    Error { message: String },
}

impl StreamEvent {
    pub fn chunk(text: impl Into<String>, done: bool) -> Self {
        StreamEvent::Chunk {
            text: text.into(),
            done,
        }
    }
}

/// Events emitted by the chat runtime.
/// The projection layer drains these to know what to recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A conversation was created, renamed or deleted
    ConversationsChanged,

    /// A different conversation is now shown
    ActiveChanged { conversation_id: String },

    /// A message was appended to a conversation's history
    MessageAppended { conversation_id: String, index: usize },

    /// A generation session started for this conversation
    GenerationStarted { conversation_id: String },

    /// Streamed text appended to the owner's pending message
    Delta { conversation_id: String, text: String },

    /// Backend progress notice
    Progress {
        conversation_id: String,
        stage: ProgressStage,
        detail: Option<String>,
    },

    /// The session reached a terminal state
    Finalized { outcome: SessionOutcome },

    /// A user action was rejected or failed
    Error { message: String },
}
