//! `localStorage` backend.
//! Persistent across page reloads; synchronous underneath, so every call
//! completes on first poll.

use async_trait::async_trait;
use web_sys::Storage;

use wizard_core::ports::StoragePort;
use wizard_types::{ChatError, Result};

use crate::js_error_text;

const WRITE_CHECK_KEY: &str = "wizard:write-check";

pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    /// Open `window.localStorage` and check that it accepts writes.
    /// Private browsing modes may expose the object but reject `setItem`.
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| ChatError::Storage(js_error_text(&e)))?
            .ok_or_else(|| ChatError::Storage("localStorage not available".to_string()))?;

        storage
            .set_item(WRITE_CHECK_KEY, "1")
            .and_then(|_| storage.remove_item(WRITE_CHECK_KEY))
            .map_err(|e| ChatError::Storage(js_error_text(&e)))?;

        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| ChatError::Storage(js_error_text(&e)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| ChatError::Storage(js_error_text(&e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| ChatError::Storage(js_error_text(&e)))
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}
