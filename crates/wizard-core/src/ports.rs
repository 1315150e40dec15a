//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `wizard-core` (pure Rust).
//! Implementations live in `wizard-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use wizard_types::{message::ChatTurn, Result};

// ─── Transport Port ──────────────────────────────────────────

/// Raw response body, read incrementally. Items may split frames, lines
/// or UTF-8 sequences at any byte.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// Body of the streaming request
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

#[async_trait(?Send)]
pub trait ChatTransport {
    /// Open the streaming endpoint. Resolves once response headers arrive.
    async fn open_stream(&self, req: &ChatRequest) -> Result<ByteStream>;

    /// Non-streaming fallback: `{prompt}` → `{response}`
    async fn ask(&self, prompt: &str) -> Result<String>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Asset Port ──────────────────────────────────────────────

#[async_trait(?Send)]
pub trait AssetPort {
    /// Fetch a text document (image metadata JSON). Non-success status is an error.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}
