//! UI-level state that drives rendering.
//! This is a read-only projection of the chat runtime state,
//! updated each tick by draining the EventBus.

use std::collections::{HashMap, HashSet};

use wizard_core::images::{ImageRef, ResolvedImage};
use wizard_core::runtime::ChatRuntime;
use wizard_core::store::ConversationStore;
use wizard_types::{
    config::AssetConfig,
    event::{ChatEvent, ProgressStage},
    session::FinishReason,
};

use crate::view::{ConversationItem, ImageSlot, MessageView};

pub struct UiState {
    pub conversations: Vec<ConversationItem>,
    /// Messages of the active conversation
    pub messages: Vec<MessageView>,
    pub active_id: String,
    /// Owner of the streaming reply, if one is running
    pub generating_for: Option<String>,
    /// Status line text
    pub status_text: String,
    /// Latest backend progress note for the running reply
    pub progress: Option<String>,
    resolved: HashMap<String, ResolvedImage>,
    requested: HashSet<String>,
    dirty: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            messages: Vec::new(),
            active_id: String::new(),
            generating_for: None,
            status_text: "Ready".to_string(),
            progress: None,
            resolved: HashMap::new(),
            requested: HashSet::new(),
            dirty: true,
        }
    }

    /// Apply drained runtime events to the status line.
    /// Returns true when anything needs repainting.
    pub fn process_events(&mut self, events: Vec<ChatEvent>) -> bool {
        if events.is_empty() {
            return self.dirty;
        }
        for event in events {
            match event {
                ChatEvent::GenerationStarted { .. } => {
                    self.status_text = "Thinking...".to_string();
                    self.progress = None;
                }
                ChatEvent::Delta { .. } => {
                    self.status_text = "Generating...".to_string();
                }
                ChatEvent::Progress { stage, detail, .. } => {
                    self.status_text = match stage {
                        ProgressStage::Init => "Preparing...",
                        ProgressStage::Step => "Working...",
                        ProgressStage::Complete => "Finishing...",
                    }
                    .to_string();
                    self.progress = detail;
                }
                ChatEvent::Finalized { outcome } => {
                    self.status_text = match outcome.reason {
                        FinishReason::Complete => "Ready".to_string(),
                        FinishReason::Aborted => "Stopped".to_string(),
                        FinishReason::TransportFailed { .. } => "Connection lost".to_string(),
                        FinishReason::ProtocolError { message } => format!("Error: {}", message),
                    };
                    self.progress = None;
                }
                ChatEvent::Error { message } => {
                    self.status_text = message;
                }
                ChatEvent::ConversationsChanged
                | ChatEvent::ActiveChanged { .. }
                | ChatEvent::MessageAppended { .. } => {}
            }
        }
        self.dirty = true;
        true
    }

    /// Recompute every view from the runtime's current state.
    pub fn refresh(&mut self, runtime: &ChatRuntime) {
        let generating_for = runtime.generating_for();
        let store = runtime.store();
        self.refresh_from(&store, generating_for, &runtime.config.assets);
    }

    pub fn refresh_from(
        &mut self,
        store: &ConversationStore,
        generating_for: Option<String>,
        assets: &AssetConfig,
    ) {
        self.active_id = store.active_id().to_string();
        self.conversations = store
            .summaries()
            .into_iter()
            .map(|c| ConversationItem::project(c, &self.active_id, generating_for.as_deref()))
            .collect();
        self.messages = store
            .active()
            .map(|c| {
                c.messages
                    .iter()
                    .map(|m| MessageView::project(m, assets, &self.resolved))
                    .collect()
            })
            .unwrap_or_default();
        self.generating_for = generating_for;
        self.dirty = false;
    }

    /// Images shown as loading that nobody has started resolving yet.
    /// Each is handed out once.
    pub fn take_unresolved(&mut self) -> Vec<ImageRef> {
        let mut fresh = Vec::new();
        for view in &self.messages {
            for slot in &view.images {
                if let ImageSlot::Loading { image } = slot {
                    if self.requested.insert(image.key().to_string()) {
                        fresh.push(image.clone());
                    }
                }
            }
        }
        fresh
    }

    /// Cache a resolution result; the next refresh picks it up.
    pub fn set_resolved(&mut self, image: &ImageRef, resolved: ResolvedImage) {
        self.resolved.insert(image.key().to_string(), resolved);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_busy(&self) -> bool {
        self.generating_for.is_some()
    }

    /// Whether the reply being streamed belongs to the conversation on screen
    pub fn is_streaming_here(&self) -> bool {
        self.generating_for.as_deref() == Some(self.active_id.as_str())
    }

    pub fn messages_html(&self) -> String {
        self.messages.iter().map(MessageView::to_html).collect()
    }

    pub fn conversations_html(&self) -> String {
        self.conversations.iter().map(ConversationItem::to_html).collect()
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
