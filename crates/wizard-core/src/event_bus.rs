//! Queue between the chat runtime and the projection layer.
//!
//! Single-threaded (WASM), shared through `Rc<RefCell<..>>`. The runtime
//! emits as it goes; the projection drains once per repaint tick, so a fast
//! stream can emit many deltas between two drains. Adjacent deltas for the
//! same conversation are merged on emit to keep the queue bounded by the
//! number of distinct transitions rather than by the number of frames.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wizard_types::event::ChatEvent;

/// Shared event queue, clone-cheap via Rc.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<ChatEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ChatEvent) {
        let mut queue = self.inner.borrow_mut();
        if let (
            Some(ChatEvent::Delta {
                conversation_id: last_id,
                text: last_text,
            }),
            ChatEvent::Delta {
                conversation_id,
                text,
            },
        ) = (queue.back_mut(), &event)
        {
            if *last_id == *conversation_id {
                last_text.push_str(text);
                return;
            }
        }
        queue.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<ChatEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }
}
