//! Wizard chat app: WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the platform adapters, the chat runtime and the render
//! projection, and mounts them onto the page's DOM.

mod app;

use wasm_bindgen::prelude::*;

/// WASM entry point, called from index.html
#[wasm_bindgen(start)]
pub async fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Wizard chat starting...");

    let document = gloo_utils::document();
    let app = app::ChatApp::mount(&document)
        .await
        .expect("Failed to mount chat UI");
    app.start();
}
