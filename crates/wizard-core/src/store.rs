//! Conversation store: the conversation list, the active pointer and the
//! naming counter.
//!
//! In-memory state is authoritative. [`ConversationStore::snapshot`] turns it
//! into the three persisted string values; a failed save never rolls anything
//! back.

use std::sync::LazyLock;
use regex::Regex;
use wizard_types::{
    config::{ChatConfig, StorageKeys},
    conversation::{Conversation, ConversationSummary},
    message::{Message, Role},
    ChatError, Result,
};

use crate::ports::StoragePort;

static LEGACY_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(New Chat|Chat|Conversation) \d+$").expect("legacy title regex is invalid")
});

const TITLE_WORDS: usize = 4;

/// Numbered default titles from older builds: the fixed legacy names, or
/// the configured default followed by a number.
fn is_legacy_title(title: &str, default_title: &str) -> bool {
    if LEGACY_TITLE.is_match(title) {
        return true;
    }
    title
        .strip_prefix(default_title)
        .and_then(|rest| rest.strip_prefix(' '))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// The persisted form of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub conversations: String,
    pub active: String,
    pub counter: String,
}

impl StoreSnapshot {
    pub async fn save(&self, storage: &dyn StoragePort, keys: &StorageKeys) -> Result<()> {
        storage.set(&keys.conversations, &self.conversations).await?;
        storage.set(&keys.active, &self.active).await?;
        storage.set(&keys.counter, &self.counter).await?;
        Ok(())
    }
}

pub struct ConversationStore {
    config: ChatConfig,
    conversations: Vec<Conversation>,
    active_id: String,
    counter: u64,
}

impl ConversationStore {
    /// A fresh store holding one default conversation.
    pub fn new(config: &ChatConfig) -> Self {
        Self::from_parts(config, None, None, None)
    }

    /// Read the three persisted values. Unreadable keys count as missing.
    pub async fn load(config: &ChatConfig, storage: &dyn StoragePort) -> Self {
        let keys = &config.storage;
        let conversations = read_key(storage, &keys.conversations).await;
        let active = read_key(storage, &keys.active).await;
        let counter = read_key(storage, &keys.counter).await;
        let store = Self::from_parts(
            config,
            conversations.as_deref(),
            active.as_deref(),
            counter.as_deref(),
        );
        log::info!(
            "Loaded {} conversation(s) from {}",
            store.conversations.len(),
            storage.backend_name()
        );
        store
    }

    /// Rebuild a store from raw persisted values.
    ///
    /// A missing or malformed list starts empty and gets one default
    /// conversation. Pending flags left by a previous process are cleared.
    pub fn from_parts(
        config: &ChatConfig,
        conversations: Option<&str>,
        active: Option<&str>,
        counter: Option<&str>,
    ) -> Self {
        let mut list: Vec<Conversation> = match conversations.map(serde_json::from_str) {
            Some(Ok(list)) => list,
            Some(Err(e)) => {
                log::warn!("Discarding malformed conversation list: {}", e);
                Vec::new()
            }
            None => Vec::new(),
        };

        for conversation in &mut list {
            if is_legacy_title(&conversation.title, &config.default_title) {
                conversation.title = config.default_title.clone();
            }
            for message in &mut conversation.messages {
                message.pending = false;
            }
        }

        let counter = counter
            .and_then(|c| c.trim().parse::<u64>().ok())
            .unwrap_or(list.len() as u64);

        let mut store = Self {
            config: config.clone(),
            conversations: list,
            active_id: String::new(),
            counter,
        };

        if store.conversations.is_empty() {
            store.create();
        }

        store.active_id = match active {
            Some(id) if store.get(id).is_some() => id.to_string(),
            _ => store.conversations[0].id.clone(),
        };
        store
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            conversations: serde_json::to_string(&self.conversations)?,
            active: self.active_id.clone(),
            counter: self.counter.to_string(),
        })
    }

    /// Insert a new default conversation at the front and make it active.
    pub fn create(&mut self) -> String {
        let avatar = self.config.avatar_for(self.counter);
        self.counter += 1;
        let conversation = Conversation::new(
            uuid::Uuid::new_v4().to_string(),
            self.config.default_title.clone(),
            avatar,
        );
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_id = id.clone();
        id
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        self.position(id)?;
        self.active_id = id.to_string();
        Ok(())
    }

    /// Rename to the first four words of `input`. Returns `false` when
    /// nothing usable was given and the title is left alone.
    pub fn rename(&mut self, id: &str, input: &str) -> Result<bool> {
        let idx = self.position(id)?;
        let Some(title) = title_from(input) else {
            return Ok(false);
        };
        self.conversations[idx].title = title;
        Ok(true)
    }

    /// Remove a conversation. The list is never left empty.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let idx = self.position(id)?;
        self.conversations.remove(idx);

        if self.conversations.is_empty() {
            self.create();
            return Ok(());
        }
        if self.active_id == id {
            let fallback = idx.min(self.conversations.len() - 1);
            self.active_id = self.conversations[fallback].id.clone();
        }
        Ok(())
    }

    /// Append to a conversation's history and return the new index.
    ///
    /// The first user message retitles a conversation still carrying the
    /// default title.
    pub fn append(&mut self, id: &str, message: Message) -> Result<usize> {
        let idx = self.position(id)?;
        let default_title = self.config.default_title.clone();
        let conversation = &mut self.conversations[idx];

        let first_user = message.role == Role::User
            && !conversation.messages.iter().any(|m| m.role == Role::User);
        if first_user && conversation.title == default_title {
            if let Some(title) = title_from(&message.content) {
                conversation.title = title;
            }
        }

        conversation.messages.push(message);
        Ok(conversation.messages.len() - 1)
    }

    /// Overwrite the content of the live pending entry.
    pub fn update_pending(&mut self, id: &str, index: usize, content: &str) -> Result<()> {
        let message = self.pending_mut(id, index)?;
        message.content = content.to_string();
        Ok(())
    }

    /// Write the final content and clear the pending mark.
    pub fn finalize_pending(
        &mut self,
        id: &str,
        index: usize,
        content: String,
        elapsed_ms: u64,
    ) -> Result<()> {
        let message = self.pending_mut(id, index)?;
        message.content = content;
        message.elapsed_ms = Some(elapsed_ms);
        message.pending = false;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.get(&self.active_id)
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.conversations.iter().map(Conversation::summary).collect()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))
    }

    fn pending_mut(&mut self, id: &str, index: usize) -> Result<&mut Message> {
        let idx = self.position(id)?;
        self.conversations[idx]
            .messages
            .get_mut(index)
            .filter(|m| m.pending)
            .ok_or_else(|| ChatError::Other(format!("no pending message at {} in {}", index, id)))
    }
}

/// Title derived from free text: its first four words, or `None` if blank.
pub fn title_from(input: &str) -> Option<String> {
    let words: Vec<&str> = input.split_whitespace().take(TITLE_WORDS).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

async fn read_key(storage: &dyn StoragePort, key: &str) -> Option<String> {
    match storage.get(key).await {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Could not read {} from {}: {}", key, storage.backend_name(), e);
            None
        }
    }
}
