/// DM Archiver - Chrome extension that archives direct-message conversations
/// Built with Rust + WASM + Yew

pub mod bridge;
pub mod config;
pub mod content;
pub mod dom;
pub mod error;
pub mod extract;
pub mod message;
pub mod messaging;
pub mod panel;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod sync;
pub mod ui;

#[cfg(test)]
mod test_support;

use bridge::ChromeStorage;
use storage::ArchiveStore;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

thread_local! {
    // One store per worker so overlapping requests queue on the same lock
    static BACKGROUND_STORE: ArchiveStore<ChromeStorage> = ArchiveStore::new(ChromeStorage);
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Decorate the host page and listen for archive changes
#[wasm_bindgen]
pub fn start_content_script() {
    let Some(window) = web_sys::window() else {
        log::warn!("No window; content script not started");
        return;
    };
    spawn_local(async move {
        if let Err(e) = content::ContentScript::start(window).await {
            log::warn!("Content script failed to start: {}", e);
        }
    });
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Answer a runtime message in the background worker
#[wasm_bindgen]
pub async fn handle_background_message(request: JsValue) -> Result<JsValue, JsValue> {
    let request: messaging::Request = serde_wasm_bindgen::from_value(request)
        .map_err(|e| JsValue::from_str(&format!("Unknown request: {}", e)))?;

    let store = BACKGROUND_STORE.with(ArchiveStore::clone);
    let response = messaging::handle(&store, request)
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    bridge::to_js(&response).map_err(|e| JsValue::from_str(&e.to_string()))
}
