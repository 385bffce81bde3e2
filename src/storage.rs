/// Archive persistence over chrome.storage.local
///
/// Every mutation is a read-modify-write of the whole `archivedMessages` list,
/// so each successful write produces exactly one storage change notification.
/// Mutations through one store run one at a time so none of them reads a list
/// another is about to overwrite.
use crate::error::Result;
use crate::message::{ArchivedMessage, PanelPosition};
use futures::lock::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::rc::Rc;

pub const ARCHIVE_KEY: &str = "archivedMessages";
pub const PANEL_POSITION_KEY: &str = "panelPosition";
pub const CONFIG_KEY: &str = "archiverConfig";

/// Key-value area shared by every extension context
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Keys touched by one write, as reported to every open context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageChange {
    keys: Vec<String>,
}

impl StorageChange {
    pub fn new(keys: Vec<String>) -> Self {
        StorageChange { keys }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// In-memory snapshot of the stored archive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    pub messages: Vec<ArchivedMessage>,
}

impl Archive {
    pub fn new() -> Self {
        Archive {
            messages: Vec::new(),
        }
    }

    /// Decode the stored value, skipping entries that no longer parse
    pub fn from_value(value: Option<Value>) -> Archive {
        let entries = match value {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => return Archive::new(),
            Some(other) => {
                log::warn!("Stored archive is not a list, ignoring: {}", other);
                return Archive::new();
            }
        };

        let messages = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(message) => Some(message),
                Err(e) => {
                    log::warn!("Skipping malformed archived message: {}", e);
                    None
                }
            })
            .collect();

        Archive { messages }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.messages)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Returns false when a record with the same id is already present
    pub fn insert(&mut self, message: ArchivedMessage) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Removes at most one record
    pub fn remove(&mut self, id: &str) -> Option<ArchivedMessage> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn ids(&self) -> HashSet<String> {
        self.messages.iter().map(|m| m.id.clone()).collect()
    }
}

/// Archive Store Client; clones share the mutation lock
#[derive(Clone)]
pub struct ArchiveStore<S> {
    area: S,
    mutations: Rc<Mutex<()>>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for ArchiveStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStore").field("area", &self.area).finish()
    }
}

impl<S: StorageArea> ArchiveStore<S> {
    pub fn new(area: S) -> Self {
        ArchiveStore {
            area,
            mutations: Rc::new(Mutex::new(())),
        }
    }

    pub fn area(&self) -> &S {
        &self.area
    }

    pub async fn load(&self) -> Result<Vec<ArchivedMessage>> {
        Ok(self.load_archive().await?.messages)
    }

    pub async fn load_archive(&self) -> Result<Archive> {
        let value = self.area.get(ARCHIVE_KEY).await?;
        Ok(Archive::from_value(value))
    }

    /// Returns whether a write happened; an already archived id is a no-op
    pub async fn append(&self, message: ArchivedMessage) -> Result<bool> {
        let _serial = self.mutations.lock().await;
        let mut archive = self.load_archive().await?;
        if !archive.insert(message) {
            return Ok(false);
        }
        self.save(&archive).await?;
        Ok(true)
    }

    /// Returns the removed record; an unknown id leaves the store untouched
    pub async fn remove(&self, id: &str) -> Result<Option<ArchivedMessage>> {
        let _serial = self.mutations.lock().await;
        let mut archive = self.load_archive().await?;
        let removed = archive.remove(id);
        if removed.is_some() {
            self.save(&archive).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        let _serial = self.mutations.lock().await;
        self.save(&Archive::new()).await
    }

    async fn save(&self, archive: &Archive) -> Result<()> {
        self.area.set(ARCHIVE_KEY, archive.to_value()?).await
    }

    pub async fn load_position(&self) -> Result<Option<PanelPosition>> {
        match self.area.get(PANEL_POSITION_KEY).await? {
            // Positions saved before any drag may hold nulls
            Some(value) => Ok(serde_json::from_value(value).ok()),
            None => Ok(None),
        }
    }

    pub async fn save_position(&self, position: PanelPosition) -> Result<()> {
        self.area
            .set(PANEL_POSITION_KEY, serde_json::to_value(position)?)
            .await
    }
}

/// Storage area backed by a map, counting writes
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStorage {
    values: std::cell::RefCell<std::collections::HashMap<String, Value>>,
    writes: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

#[cfg(test)]
impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Suspends once before delegating reads, like a real async storage round trip
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct YieldingStorage {
    inner: MemoryStorage,
}

#[cfg(test)]
impl StorageArea for YieldingStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut yielded = false;
        futures::future::poll_fn(|cx| {
            if yielded {
                std::task::Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
        })
        .await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.inner.set(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_message as create_test_message;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_concurrent_appends_keep_both_records() {
        let store = ArchiveStore::new(YieldingStorage::default());

        let (first, second) = block_on(async {
            futures::join!(
                store.append(create_test_message("a", "Alice")),
                store.append(create_test_message("b", "Bob")),
            )
        });

        assert!(first.unwrap());
        assert!(second.unwrap());
        let ids: Vec<String> = block_on(store.load()).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.area().inner.writes(), 2);
    }

    #[test]
    fn test_concurrent_append_and_remove_do_not_clobber() {
        let store = ArchiveStore::new(YieldingStorage::default());
        block_on(store.append(create_test_message("a", "Alice"))).unwrap();

        let (appended, removed) = block_on(async {
            futures::join!(
                store.append(create_test_message("b", "Bob")),
                store.remove("a"),
            )
        });

        assert!(appended.unwrap());
        assert_eq!(removed.unwrap().map(|m| m.id), Some("a".to_string()));
        let ids: Vec<String> = block_on(store.load()).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_archive_insert_rejects_duplicate_id() {
        let mut archive = Archive::new();

        assert!(archive.insert(create_test_message("a", "Alice")));
        assert!(!archive.insert(create_test_message("a", "Someone Else")));

        assert_eq!(archive.messages.len(), 1);
        assert_eq!(archive.messages[0].username, "Alice");
    }

    #[test]
    fn test_archive_remove_at_most_one() {
        let mut archive = Archive {
            messages: vec![
                create_test_message("a", "Alice"),
                create_test_message("b", "Bob"),
                // Duplicate ids can only come from hand-edited storage
                create_test_message("a", "Alice again"),
            ],
        };

        let removed = archive.remove("a");

        assert_eq!(removed.unwrap().username, "Alice");
        assert_eq!(archive.messages.len(), 2);
        assert!(archive.contains("a"));
    }

    #[test]
    fn test_from_value_skips_malformed_entries() {
        let value = json!([
            { "id": "ok", "content": "x", "timestamp": "2024-05-14T12:00:00.000Z" },
            { "content": "missing id" },
        ]);

        let archive = Archive::from_value(Some(value));

        assert_eq!(archive.messages.len(), 1);
        assert_eq!(archive.messages[0].id, "ok");
        assert_eq!(Archive::from_value(Some(json!("junk"))), Archive::new());
    }

    #[test]
    fn test_load_empty_store() {
        let store = ArchiveStore::new(MemoryStorage::new());
        assert!(block_on(store.load()).unwrap().is_empty());
    }

    #[test]
    fn test_append_twice_stores_once() {
        let store = ArchiveStore::new(MemoryStorage::new());

        assert!(block_on(store.append(create_test_message("a", "Alice"))).unwrap());
        assert!(!block_on(store.append(create_test_message("a", "Alice"))).unwrap());

        assert_eq!(block_on(store.load()).unwrap().len(), 1);
        assert_eq!(store.area().writes(), 1);
    }

    #[test]
    fn test_append_then_remove_round_trip() {
        let store = ArchiveStore::new(MemoryStorage::new());
        let message = create_test_message("a", "Alice");

        block_on(store.append(message.clone())).unwrap();
        assert!(block_on(store.load()).unwrap().contains(&message));

        let removed = block_on(store.remove("a")).unwrap();
        assert_eq!(removed, Some(message.clone()));
        assert!(!block_on(store.load()).unwrap().contains(&message));
    }

    #[test]
    fn test_remove_unknown_id_leaves_store_unchanged() {
        let store = ArchiveStore::new(MemoryStorage::new());
        block_on(store.append(create_test_message("a", "Alice"))).unwrap();
        let before = block_on(store.load()).unwrap();

        assert_eq!(block_on(store.remove("missing")).unwrap(), None);

        assert_eq!(block_on(store.load()).unwrap(), before);
        assert_eq!(store.area().writes(), 1);
    }

    #[test]
    fn test_clear() {
        let store = ArchiveStore::new(MemoryStorage::new());
        block_on(store.append(create_test_message("a", "Alice"))).unwrap();
        block_on(store.append(create_test_message("b", "Bob"))).unwrap();

        block_on(store.clear()).unwrap();

        assert!(block_on(store.load()).unwrap().is_empty());
    }

    #[test]
    fn test_panel_position_round_trip() {
        let store = ArchiveStore::new(MemoryStorage::new());
        assert_eq!(block_on(store.load_position()).unwrap(), None);

        let position = PanelPosition { left: 120.0, top: 64.5 };
        block_on(store.save_position(position)).unwrap();

        assert_eq!(block_on(store.load_position()).unwrap(), Some(position));
    }

    #[test]
    fn test_panel_position_with_nulls_is_unset() {
        let storage = MemoryStorage::new();
        storage.insert(PANEL_POSITION_KEY, json!({ "left": null, "top": null }));
        let store = ArchiveStore::new(storage);

        assert_eq!(block_on(store.load_position()).unwrap(), None);
    }
}
