//! Chat runtime: the generation session controller.
//!
//! One `send` drives a session through
//! `Sending → Streaming → Finalizing → Idle`:
//! 1. Append the user message and claim the session slot
//! 2. Open the stream (or fall back to the non-streaming endpoint)
//! 3. Apply each chunk to the owner's pending message, persisting as it goes
//! 4. Finalize exactly once, whatever ended the session
//!
//! Writes always target the conversation that started the session, so the
//! user may switch away and back while a reply is still streaming.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::Aborted;
use futures::stream::StreamExt;
use serde_json::Value;
use wizard_types::{
    config::ChatConfig,
    event::{ChatEvent, ProgressStage, StreamEvent},
    message::Message,
    session::{FinishReason, SessionOutcome},
    ChatError, Result,
};

use crate::decoder::FrameStream;
use crate::event_bus::EventBus;
use crate::ports::*;
use crate::render::render_reply;
use crate::session::SessionGuard;
use crate::store::ConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Sending,
    Streaming,
    Finalizing,
}

/// The chat runtime state. Clone-cheap; clones share everything.
#[derive(Clone)]
pub struct ChatRuntime {
    pub config: Rc<ChatConfig>,
    pub event_bus: EventBus,
    store: Rc<RefCell<ConversationStore>>,
    guard: SessionGuard,
    state: Rc<Cell<GenerationState>>,
    storage: Rc<dyn StoragePort>,
}

impl ChatRuntime {
    pub fn new(
        config: ChatConfig,
        store: ConversationStore,
        storage: Rc<dyn StoragePort>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config: Rc::new(config),
            event_bus,
            store: Rc::new(RefCell::new(store)),
            guard: SessionGuard::new(),
            state: Rc::new(Cell::new(GenerationState::Idle)),
            storage,
        }
    }

    /// Restore the conversation store from `storage` and build a runtime on it.
    pub async fn load(config: ChatConfig, storage: Rc<dyn StoragePort>, event_bus: EventBus) -> Self {
        let store = ConversationStore::load(&config, storage.as_ref()).await;
        Self::new(config, store, storage, event_bus)
    }

    /// Shared read access to the store for projection.
    pub fn store(&self) -> std::cell::Ref<'_, ConversationStore> {
        self.store.borrow()
    }

    pub fn state(&self) -> GenerationState {
        self.state.get()
    }

    pub fn is_generating(&self) -> bool {
        self.guard.is_active()
    }

    /// Conversation the live session writes into, if any.
    pub fn generating_for(&self) -> Option<String> {
        self.guard.owner()
    }

    /// Send `text` from the active conversation and run the reply to completion.
    ///
    /// Returns `Ok(None)` without side effects when the text is blank or a
    /// session is already running. Stream failures end the session with a
    /// suffix in the reply; they are never returned as `Err`.
    pub async fn send(&self, text: &str, transport: &dyn ChatTransport) -> Result<Option<SessionOutcome>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if self.guard.is_active() {
            log::debug!("Send ignored, a reply is still being generated");
            return Ok(None);
        }

        // Prompt first, then the session slot.
        let owner = self.store.borrow().active_id().to_string();
        let index = self.store.borrow_mut().append(&owner, Message::user(text))?;
        if !self.guard.try_begin(&owner) {
            return Ok(None);
        }

        self.state.set(GenerationState::Sending);
        self.event_bus.emit(ChatEvent::MessageAppended {
            conversation_id: owner.clone(),
            index,
        });
        self.event_bus.emit(ChatEvent::ConversationsChanged);
        self.event_bus.emit(ChatEvent::GenerationStarted {
            conversation_id: owner.clone(),
        });
        log::info!("Generation started for {}", owner);
        self.persist().await;

        let request = self.request_for(&owner);
        // Cancel reaches the request itself, not only the body.
        let reason = match self.guard.abortable(transport.open_stream(&request)).await {
            Err(Aborted) | Ok(Err(ChatError::Cancelled)) => FinishReason::Aborted,
            Ok(Ok(body)) => self.stream_reply(&owner, body).await,
            Ok(Err(_)) if self.guard.cancel_requested() => FinishReason::Aborted,
            Ok(Err(e)) => self.fallback_reply(&owner, text, e, transport).await,
        };

        Ok(Some(self.finalize(&owner, reason).await))
    }

    /// Stop the live session. No-op when idle.
    pub fn cancel(&self) {
        if self.guard.abort() {
            log::info!("Cancellation requested");
        }
    }

    /// Create a conversation and make it active. Allowed while generating.
    pub async fn create_conversation(&self) -> String {
        let id = self.store.borrow_mut().create();
        self.event_bus.emit(ChatEvent::ConversationsChanged);
        self.event_bus.emit(ChatEvent::ActiveChanged {
            conversation_id: id.clone(),
        });
        self.persist().await;
        id
    }

    /// Show another conversation. While a session runs only its owner may
    /// be switched to.
    pub async fn switch_to(&self, id: &str) -> Result<()> {
        if self.store.borrow().active_id() == id {
            return Ok(());
        }
        if let Some(owner) = self.guard.owner() {
            if owner != id {
                return Err(self.reject(ChatError::Busy));
            }
        }
        self.store.borrow_mut().set_active(id)?;
        self.event_bus.emit(ChatEvent::ActiveChanged {
            conversation_id: id.to_string(),
        });
        self.persist().await;
        Ok(())
    }

    pub async fn rename(&self, id: &str, input: &str) -> Result<bool> {
        if self.guard.is_active() {
            return Err(self.reject(ChatError::Busy));
        }
        let renamed = self.store.borrow_mut().rename(id, input)?;
        if renamed {
            self.event_bus.emit(ChatEvent::ConversationsChanged);
            self.persist().await;
        }
        Ok(renamed)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.guard.is_active() {
            return Err(self.reject(ChatError::Busy));
        }
        let active = {
            let mut store = self.store.borrow_mut();
            store.delete(id)?;
            store.active_id().to_string()
        };
        self.event_bus.emit(ChatEvent::ConversationsChanged);
        self.event_bus.emit(ChatEvent::ActiveChanged {
            conversation_id: active,
        });
        self.persist().await;
        Ok(())
    }

    // ─── Session steps ───────────────────────────────────────

    async fn stream_reply(&self, owner: &str, body: ByteStream) -> FinishReason {
        self.state.set(GenerationState::Streaming);
        let mut events = self.guard.abortable(FrameStream::new(body));

        loop {
            match events.next().await {
                Some(Ok(StreamEvent::Chunk { text, done })) => {
                    self.apply_chunk(owner, &text).await;
                    if done {
                        return FinishReason::Complete;
                    }
                }
                Some(Ok(StreamEvent::Progress { stage, payload })) => {
                    self.event_bus.emit(ChatEvent::Progress {
                        conversation_id: owner.to_string(),
                        stage,
                        detail: progress_detail(stage, &payload),
                    });
                }
                Some(Ok(StreamEvent::Error { message })) => {
                    return FinishReason::ProtocolError { message };
                }
                Some(Err(ChatError::Cancelled)) => return FinishReason::Aborted,
                Some(Err(_)) if self.guard.cancel_requested() => return FinishReason::Aborted,
                Some(Err(e)) => {
                    return FinishReason::TransportFailed {
                        detail: e.to_string(),
                    }
                }
                None if events.is_aborted() => return FinishReason::Aborted,
                None => return FinishReason::Complete,
            }
        }
    }

    async fn fallback_reply(
        &self,
        owner: &str,
        prompt: &str,
        cause: ChatError,
        transport: &dyn ChatTransport,
    ) -> FinishReason {
        log::warn!("Streaming unavailable ({}), using {}", cause, self.config.endpoints.ask_url);
        match self.guard.abortable(transport.ask(prompt)).await {
            Err(Aborted) | Ok(Err(ChatError::Cancelled)) => FinishReason::Aborted,
            Ok(_) if self.guard.cancel_requested() => FinishReason::Aborted,
            Ok(Ok(response)) => {
                self.apply_chunk(owner, &response).await;
                FinishReason::Complete
            }
            Ok(Err(e)) => FinishReason::TransportFailed {
                detail: e.to_string(),
            },
        }
    }

    /// Append streamed text to the owner's pending message, creating it on
    /// the first chunk.
    async fn apply_chunk(&self, owner: &str, text: &str) {
        let Some((pending, accumulated)) = self.guard.with_session(|s| {
            s.accumulated.push_str(text);
            (s.pending_index, s.accumulated.clone())
        }) else {
            return;
        };

        let written = {
            let mut store = self.store.borrow_mut();
            match pending {
                Some(index) => store.update_pending(owner, index, &accumulated).map(|_| None),
                None => store
                    .append(owner, Message::pending_assistant(accumulated))
                    .map(Some),
            }
        };

        match written {
            Ok(Some(index)) => {
                self.guard.with_session(|s| s.pending_index = Some(index));
                self.event_bus.emit(ChatEvent::MessageAppended {
                    conversation_id: owner.to_string(),
                    index,
                });
            }
            Ok(None) => {}
            Err(e) => log::warn!("Could not write streamed text for {}: {}", owner, e),
        }

        self.event_bus.emit(ChatEvent::Delta {
            conversation_id: owner.to_string(),
            text: text.to_string(),
        });
        self.persist().await;
    }

    /// Write the terminal message, free the slot and announce the outcome.
    async fn finalize(&self, owner: &str, reason: FinishReason) -> SessionOutcome {
        self.state.set(GenerationState::Finalizing);

        let (pending, accumulated, elapsed_ms) = self
            .guard
            .with_session(|s| (s.pending_index, std::mem::take(&mut s.accumulated), s.elapsed_ms()))
            .unwrap_or((None, String::new(), 0));

        let content = reason.finish_text(&accumulated);
        let rendered = render_reply(&content, &self.config.assets);

        let written = {
            let mut store = self.store.borrow_mut();
            match pending {
                Some(index) => store
                    .finalize_pending(owner, index, content.clone(), elapsed_ms)
                    .map(|_| index),
                None => {
                    let mut message = Message::assistant(content.clone());
                    message.elapsed_ms = Some(elapsed_ms);
                    store.append(owner, message)
                }
            }
        };
        let message_index = match written {
            Ok(index) => {
                if pending.is_none() {
                    self.event_bus.emit(ChatEvent::MessageAppended {
                        conversation_id: owner.to_string(),
                        index,
                    });
                }
                index
            }
            Err(e) => {
                log::error!("Could not write final reply for {}: {}", owner, e);
                pending.unwrap_or_default()
            }
        };

        self.guard.release();
        self.state.set(GenerationState::Idle);

        match &reason {
            FinishReason::Complete => log::info!("Generation for {} completed in {}ms", owner, elapsed_ms),
            FinishReason::Aborted => log::info!("Generation for {} stopped by user", owner),
            failed => log::error!("Generation for {} failed: {:?}", owner, failed),
        }

        let outcome = SessionOutcome {
            conversation_id: owner.to_string(),
            message_index,
            reason,
            content,
            html: rendered.html,
            elapsed_ms,
        };
        self.event_bus.emit(ChatEvent::Finalized {
            outcome: outcome.clone(),
        });
        self.persist().await;
        outcome
    }

    // ─── Helpers ─────────────────────────────────────────────

    fn request_for(&self, owner: &str) -> ChatRequest {
        let store = self.store.borrow();
        let messages = store
            .get(owner)
            .map(|c| {
                c.messages
                    .iter()
                    .filter(|m| !m.pending)
                    .map(Message::to_turn)
                    .collect()
            })
            .unwrap_or_default();
        ChatRequest { messages }
    }

    /// Save the store. Failures are logged and otherwise ignored.
    async fn persist(&self) {
        let snapshot = self.store.borrow().snapshot();
        let result = match snapshot {
            Ok(snapshot) => snapshot.save(self.storage.as_ref(), &self.config.storage).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            log::warn!("Persisting conversations to {} failed: {}", self.storage.backend_name(), e);
        }
    }

    fn reject(&self, error: ChatError) -> ChatError {
        self.event_bus.emit(ChatEvent::Error {
            message: error.to_string(),
        });
        error
    }
}

/// Short human-readable note for a progress frame.
fn progress_detail(stage: ProgressStage, payload: &Value) -> Option<String> {
    ["message", "step", "detail", "status"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| (stage == ProgressStage::Complete).then(|| "Done".to_string()))
}
