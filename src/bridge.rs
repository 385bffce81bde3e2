/// chrome.storage and runtime messaging through `bridge.js`
use crate::error::{ArchiveError, Result};
use crate::messaging::{Request, Response};
use crate::storage::{StorageArea, StorageChange};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> std::result::Result<(), JsValue>;

    fn addStorageListener(callback: &js_sys::Function) -> JsValue;

    fn removeStorageListener(listener: &JsValue);

    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> std::result::Result<JsValue, JsValue>;
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue> {
    // Plain objects rather than ES Maps, so chrome.storage can persist them
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| ArchiveError::Bridge(e.to_string()))
}

/// chrome.storage.local
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

impl StorageArea for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = getStorage(key).await.map_err(ArchiveError::bridge)?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| ArchiveError::Storage(format!("Failed to parse {}: {}", key, e)))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        setStorage(key, to_js(&value)?)
            .await
            .map_err(ArchiveError::bridge)
    }
}

/// Live chrome.storage.onChanged listener, removed on drop
pub struct StorageSubscription {
    listener: JsValue,
    _callback: Closure<dyn FnMut(JsValue)>,
}

impl StorageSubscription {
    pub fn subscribe(on_change: impl Fn(StorageChange) + 'static) -> StorageSubscription {
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |keys: JsValue| {
            match serde_wasm_bindgen::from_value::<Vec<String>>(keys) {
                Ok(keys) => on_change(StorageChange::new(keys)),
                Err(e) => log::warn!("Unreadable storage change: {}", e),
            }
        });
        let listener = addStorageListener(callback.as_ref().unchecked_ref());

        StorageSubscription {
            listener,
            _callback: callback,
        }
    }
}

impl Drop for StorageSubscription {
    fn drop(&mut self) {
        removeStorageListener(&self.listener);
    }
}

/// Ask the background worker; the answer arrives asynchronously
pub async fn send_request(request: Request) -> Result<Response> {
    let reply = sendRuntimeMessage(to_js(&request)?)
        .await
        .map_err(ArchiveError::bridge)?;
    serde_wasm_bindgen::from_value(reply).map_err(|e| ArchiveError::Bridge(e.to_string()))
}
