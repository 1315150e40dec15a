use serde::{Deserialize, Serialize};

/// Marker appended when the user stops a generation.
pub const STOP_MARKER: &str = "[Generation stopped]";

/// Why a generation session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinishReason {
    Complete,
    /// Stopped by the user
    Aborted,
    /// The request or a stream read failed
    TransportFailed { detail: String },
    /// The backend sent an explicit error frame
    ProtocolError { message: String },
}

impl FinishReason {
    /// Human-readable suffix appended to whatever text already streamed.
    pub fn suffix(&self) -> Option<String> {
        match self {
            FinishReason::Complete => None,
            FinishReason::Aborted => Some(STOP_MARKER.to_string()),
            FinishReason::TransportFailed { detail } => {
                Some(format!("[Connection lost: {}]", detail))
            }
            FinishReason::ProtocolError { message } => Some(format!("[Error: {}]", message)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FinishReason::TransportFailed { .. } | FinishReason::ProtocolError { .. }
        )
    }

    /// Final message content for the given accumulated text.
    pub fn finish_text(&self, accumulated: &str) -> String {
        match self.suffix() {
            None => accumulated.to_string(),
            Some(suffix) if accumulated.is_empty() => suffix,
            Some(suffix) => format!("{}\n\n{}", accumulated, suffix),
        }
    }
}

/// Result of one generation session, written once at finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Conversation that started the session
    pub conversation_id: String,
    /// Index of the finalized assistant message in that conversation
    pub message_index: usize,
    pub reason: FinishReason,
    /// Raw persisted content, suffix included
    pub content: String,
    /// Rendered prose markup of `content`
    pub html: String,
    pub elapsed_ms: u64,
}
