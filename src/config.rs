/// Selectors and tunables for the content script
use crate::storage::{StorageArea, CONFIG_KEY};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiverConfig {
    /// Marks one conversation row in the host page
    pub row_selector: String,
    /// Stable per-row attribute used as the record id when present
    pub row_id_attribute: String,
    /// Anchor next to which the panel toggle is injected
    pub settings_selector: String,
    /// Virtualized list container nudged after a restore
    pub scroll_container_selector: String,
    /// Rows on this route are never decorated
    pub excluded_path: String,
    pub batch_size: usize,
    pub debounce_ms: u32,
    /// Length of the text-prefix fallback id
    pub id_prefix_chars: usize,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        ArchiverConfig {
            row_selector: r#"[data-testid="conversation"]"#.to_string(),
            row_id_attribute: "data-item-id".to_string(),
            settings_selector: r#"[aria-label="Settings"], [data-testid="settings"]"#.to_string(),
            scroll_container_selector: r#"[role="presentation"]"#.to_string(),
            excluded_path: "/messages/requests".to_string(),
            batch_size: 10,
            debounce_ms: 300,
            id_prefix_chars: 30,
        }
    }
}

impl ArchiverConfig {
    /// Read the optional override from storage; anything unusable yields the defaults
    pub async fn load<S: StorageArea>(storage: &S) -> ArchiverConfig {
        match storage.get(CONFIG_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config override: {}", e);
                ArchiverConfig::default()
            }),
            Ok(None) => ArchiverConfig::default(),
            Err(e) => {
                log::warn!("Failed to read config override: {}", e);
                ArchiverConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_load_without_override() {
        let storage = MemoryStorage::new();
        assert_eq!(block_on(ArchiverConfig::load(&storage)), ArchiverConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let storage = MemoryStorage::new();
        storage.insert(CONFIG_KEY, json!({ "batchSize": 25, "debounceMs": 50 }));

        let config = block_on(ArchiverConfig::load(&storage));

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.row_id_attribute, "data-item-id");
    }

    #[test]
    fn test_malformed_override_falls_back() {
        let storage = MemoryStorage::new();
        storage.insert(CONFIG_KEY, json!({ "batchSize": "lots" }));

        assert_eq!(block_on(ArchiverConfig::load(&storage)), ArchiverConfig::default());
    }
}
