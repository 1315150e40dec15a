use serde::{Deserialize, Serialize};
use crate::conversation::DEFAULT_TITLE;

/// Top-level chat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub endpoints: EndpointConfig,
    pub assets: AssetConfig,
    pub storage: StorageKeys,
    /// Title given to fresh conversations
    pub default_title: String,
    /// Avatar references cycled through as conversations are created
    pub avatars: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            assets: AssetConfig::default(),
            storage: StorageKeys::default(),
            default_title: DEFAULT_TITLE.to_string(),
            avatars: DEFAULT_AVATARS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChatConfig {
    /// Avatar for the n-th conversation ever created.
    pub fn avatar_for(&self, counter: u64) -> String {
        if self.avatars.is_empty() {
            return String::new();
        }
        let idx = (counter as usize) % self.avatars.len();
        self.avatars[idx].clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Streaming endpoint, body `{messages}`
    pub stream_url: String,
    /// Non-streaming fallback, body `{prompt}`
    pub ask_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            stream_url: "/api/copilot/chat/stream".to_string(),
            ask_url: "/api/ask".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Where `LOGO_<id>_latest.json` / `_history.json` are served from
    pub metadata_base: String,
    /// Path segments that map a local file path onto a public asset path
    pub public_segments: Vec<PublicSegment>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            metadata_base: "/generated_images/".to_string(),
            public_segments: vec![
                PublicSegment::new("outputs/", "/outputs/"),
                PublicSegment::new("generated_images/", "/generated_images/"),
            ],
        }
    }
}

/// `marker` located anywhere in a local path is replaced, together with
/// everything before it, by `public_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSegment {
    pub marker: String,
    pub public_prefix: String,
}

impl PublicSegment {
    pub fn new(marker: impl Into<String>, public_prefix: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

/// Keys of the persistence surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub conversations: String,
    pub active: String,
    pub counter: String,
    pub config: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            conversations: "wizard:conversations".to_string(),
            active: "wizard:active".to_string(),
            counter: "wizard:counter".to_string(),
            config: "wizard:config".to_string(),
        }
    }
}

const DEFAULT_AVATARS: &[&str] = &[
    "/static/avatars/wizard.svg",
    "/static/avatars/owl.svg",
    "/static/avatars/crystal.svg",
    "/static/avatars/scroll.svg",
];
