/// Request/response relay answered by the background worker
use crate::error::Result;
use crate::message::ArchivedMessage;
use crate::storage::{ArchiveStore, StorageArea};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetArchived,
    ClearArchive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Archived { archived: Vec<ArchivedMessage> },
    Cleared { success: bool },
}

pub async fn handle<S: StorageArea>(store: &ArchiveStore<S>, request: Request) -> Result<Response> {
    match request {
        Request::GetArchived => Ok(Response::Archived {
            archived: store.load().await?,
        }),
        Request::ClearArchive => {
            store.clear().await?;
            log::info!("Archive cleared from another context");
            Ok(Response::Cleared { success: true })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::test_support::sample_message;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_value(json!({ "type": "getArchived" })).unwrap();
        assert_eq!(request, Request::GetArchived);

        let request: Request = serde_json::from_value(json!({ "type": "clearArchive" })).unwrap();
        assert_eq!(request, Request::ClearArchive);

        assert!(serde_json::from_value::<Request>(json!({ "type": "restore" })).is_err());
    }

    #[test]
    fn test_get_archived() {
        let store = ArchiveStore::new(MemoryStorage::new());
        block_on(store.append(sample_message("a", "Alice"))).unwrap();

        let response = block_on(handle(&store, Request::GetArchived)).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["archived"][0]["id"], "a");
        assert_eq!(json["archived"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_archive() {
        let store = ArchiveStore::new(MemoryStorage::new());
        block_on(store.append(sample_message("a", "Alice"))).unwrap();

        let response = block_on(handle(&store, Request::ClearArchive)).unwrap();

        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "success": true }));
        assert!(block_on(store.load()).unwrap().is_empty());
    }
}
