//! WASM-target tests for wizard-platform (Node.js runtime).
//!
//! Covers MemoryStorage, the store/runtime round trip through it and the
//! fetch abort guard via `wasm-pack test --node`. localStorage and fetch need a browser.

use wasm_bindgen_test::*;

use std::rc::Rc;
use wizard_core::event_bus::EventBus;
use wizard_core::ports::StoragePort;
use wizard_core::runtime::ChatRuntime;
use wizard_core::store::ConversationStore;
use wizard_platform::storage::MemoryStorage;
use wizard_platform::transport::abort::FetchAbort;
use wizard_types::config::ChatConfig;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    let result = storage.get("nonexistent").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_set_and_overwrite() {
    let storage = MemoryStorage::new();
    storage.set("key", "v1").await.unwrap();
    storage.set("key", "v2").await.unwrap();
    assert_eq!(storage.get("key").await.unwrap(), Some("v2".to_string()));
}

#[wasm_bindgen_test]
async fn memory_storage_delete() {
    let storage = MemoryStorage::new();
    storage.set("key", "val").await.unwrap();
    storage.delete("key").await.unwrap();
    assert!(storage.get("key").await.unwrap().is_none());
    storage.delete("nonexistent").await.unwrap();
}

// ─── Store persistence through MemoryStorage ─────────────

#[wasm_bindgen_test]
async fn store_persists_to_configured_keys() {
    let config = ChatConfig::default();
    let storage = MemoryStorage::new();
    let store = ConversationStore::new(&config);
    store
        .snapshot()
        .unwrap()
        .save(&storage, &config.storage)
        .await
        .unwrap();

    let active = storage.get("wizard:active").await.unwrap();
    assert_eq!(active.as_deref(), Some(store.active_id()));
    assert_eq!(storage.get("wizard:counter").await.unwrap().as_deref(), Some("1"));
}

#[wasm_bindgen_test]
async fn runtime_reloads_created_conversations() {
    let storage: Rc<dyn StoragePort> = Rc::new(MemoryStorage::new());
    let runtime = ChatRuntime::load(ChatConfig::default(), storage.clone(), EventBus::new()).await;
    let created = runtime.create_conversation().await;

    let reloaded = ChatRuntime::load(ChatConfig::default(), storage, EventBus::new()).await;
    assert_eq!(reloaded.store().conversations().len(), 2);
    assert_eq!(reloaded.store().active_id(), created);
}

// ─── FetchAbort Tests ────────────────────────────────────

#[wasm_bindgen_test]
fn fetch_abort_fires_when_dropped_armed() {
    let abort = FetchAbort::new().unwrap();
    let signal = abort.signal();
    assert!(!signal.aborted());
    drop(abort);
    assert!(signal.aborted());
}

#[wasm_bindgen_test]
fn fetch_abort_disarmed_leaves_request_alone() {
    let abort = FetchAbort::new().unwrap();
    let signal = abort.signal();
    abort.disarm();
    assert!(!signal.aborted());
}
