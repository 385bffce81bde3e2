/// Data structures for archived conversations
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when no identity could be recovered from a row
pub const DEFAULT_USERNAME: &str = "User";

/// Text the host page shows for a conversation that only has an accepted request
pub const ACCEPTED_REQUEST: &str = "You accepted the request";

/// A hidden conversation row, snapshotted at archive time.
///
/// Records are never edited once stored; they are only removed by restore or clear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub handle: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_preview: String,
}

impl ArchivedMessage {
    /// When the underlying conversation happened, falling back to archive time
    pub fn best_timestamp(&self) -> DateTime<Utc> {
        self.message_timestamp.unwrap_or(self.timestamp)
    }
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

/// Saved top-left corner of the floating panel, in viewport pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PanelPosition {
    pub left: f64,
    pub top: f64,
}
