//! Exclusive ownership of the one generation session that may run at a time.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, Abortable};

/// State of the live generation session.
#[derive(Debug)]
pub struct ActiveSession {
    /// Conversation that started the session; fixed for its lifetime
    pub owner_id: String,
    /// Index of the pending assistant entry, once the first chunk arrived
    pub pending_index: Option<usize>,
    pub accumulated: String,
    pub started_at: DateTime<Utc>,
    cancel_requested: bool,
    /// One handle per wrapped phase: opening, reading, fallback
    abort_handles: Vec<AbortHandle>,
}

impl ActiveSession {
    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }
}

/// Shared handle to the session slot. Clone-cheap via Rc.
#[derive(Clone, Default)]
pub struct SessionGuard {
    inner: Rc<RefCell<Option<ActiveSession>>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `owner_id`.
    ///
    /// This is the only way a session comes into existence. Returns `false`
    /// if another session already holds the slot.
    pub fn try_begin(&self, owner_id: &str) -> bool {
        let mut slot = self.inner.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(ActiveSession {
            owner_id: owner_id.to_string(),
            pending_index: None,
            accumulated: String::new(),
            started_at: Utc::now(),
            cancel_requested: false,
            abort_handles: Vec::new(),
        });
        true
    }

    /// Tie a future or stream to the live session so [`abort`](Self::abort)
    /// interrupts it at its next poll.
    ///
    /// Anything wrapped after a cancel, or with no session running, comes
    /// back already aborted.
    pub fn abortable<T>(&self, inner: T) -> Abortable<T> {
        let (handle, registration) = AbortHandle::new_pair();
        match self.inner.borrow_mut().as_mut() {
            Some(session) if !session.cancel_requested => session.abort_handles.push(handle),
            _ => handle.abort(),
        }
        Abortable::new(inner, registration)
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().is_some()
    }

    pub fn owner(&self) -> Option<String> {
        self.inner.borrow().as_ref().map(|s| s.owner_id.clone())
    }

    pub fn cancel_requested(&self) -> bool {
        self.inner
            .borrow()
            .as_ref()
            .is_some_and(ActiveSession::cancel_requested)
    }

    /// Signal the live session to stop. Returns `false` when idle.
    pub fn abort(&self) -> bool {
        let mut slot = self.inner.borrow_mut();
        let Some(session) = slot.as_mut() else {
            return false;
        };
        session.cancel_requested = true;
        for handle in &session.abort_handles {
            handle.abort();
        }
        true
    }

    /// Run `f` against the live session, if there is one.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut ActiveSession) -> R) -> Option<R> {
        self.inner.borrow_mut().as_mut().map(f)
    }

    /// Free the slot, handing back the session that held it.
    pub fn release(&self) -> Option<ActiveSession> {
        self.inner.borrow_mut().take()
    }
}
