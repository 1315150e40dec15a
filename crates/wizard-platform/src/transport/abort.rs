//! Ties a browser `fetch` to the future awaiting it.

use web_sys::{AbortController, AbortSignal};
use wizard_types::{ChatError, Result};

use crate::js_error_text;

/// Aborts the request it signals when dropped while still armed, so a
/// cancelled session also stops the network request.
pub struct FetchAbort {
    controller: AbortController,
    armed: bool,
}

impl FetchAbort {
    pub fn new() -> Result<Self> {
        let controller =
            AbortController::new().map_err(|e| ChatError::JsInterop(js_error_text(&e)))?;
        Ok(Self {
            controller,
            armed: true,
        })
    }

    pub fn signal(&self) -> AbortSignal {
        self.controller.signal()
    }

    /// The request finished or handed its body on; leave it alone.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FetchAbort {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("Aborting unfinished request");
            self.controller.abort();
        }
    }
}
