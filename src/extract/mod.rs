/// Field extraction from conversation rows
///
/// Everything here is best effort against markup we do not own: each step has
/// a fallback, so extraction always yields a usable record.
use crate::message::ArchivedMessage;
use chrono::{DateTime, FixedOffset, Utc};
use identity::{IdentityStrategy, resolve_or_default, standard_strategies};
use url::Url;

pub mod identity;
pub mod preview;
pub mod timestamp;

/// DOM-independent view of one conversation row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSnapshot {
    /// Stable id attribute, when the host page provides one
    pub item_id: Option<String>,
    /// Rendered text, one line per visual line
    pub text: String,
    pub html: String,
    /// Text of the first `a[role="link"]`
    pub link_text: Option<String>,
    /// Text of the first `strong` / `span[dir="auto"]`
    pub styled_text: Option<String>,
    /// Trimmed non-empty text nodes in document order
    pub text_nodes: Vec<String>,
    pub image_sources: Vec<String>,
}

impl RowSnapshot {
    /// Snapshot of a row known only by its text
    pub fn from_text(text: &str) -> RowSnapshot {
        RowSnapshot {
            text: text.to_string(),
            text_nodes: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            ..Default::default()
        }
    }

    /// The id attribute, else the first `prefix_chars` characters of the text.
    ///
    /// Rows with the same leading text and no id attribute collide.
    pub fn message_id(&self, prefix_chars: usize) -> String {
        match self.item_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.text.chars().take(prefix_chars).collect(),
        }
    }
}

/// Everything recovered from a row besides its id and raw snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub username: String,
    pub handle: String,
    pub message_timestamp: Option<DateTime<Utc>>,
    pub preview: String,
    pub avatar: String,
}

pub struct FieldExtractor {
    strategies: Vec<Box<dyn IdentityStrategy>>,
}

impl FieldExtractor {
    pub fn new(strategies: Vec<Box<dyn IdentityStrategy>>) -> Self {
        FieldExtractor { strategies }
    }

    pub fn extract(&self, row: &RowSnapshot, now: DateTime<FixedOffset>) -> ExtractedFields {
        let (identity, found) = resolve_or_default(&self.strategies, row);
        let preview = preview::extract_preview(&row.text, found.then_some(&identity));

        ExtractedFields {
            message_timestamp: timestamp::parse_message_time(&row.text, now),
            preview,
            avatar: find_avatar(&row.image_sources),
            username: identity.username,
            handle: identity.handle,
        }
    }

    /// Build the record stored when the user archives `row`
    pub fn archive(&self, row: &RowSnapshot, id: String, now: DateTime<FixedOffset>) -> ArchivedMessage {
        let fields = self.extract(row, now);
        let archived_at = now.with_timezone(&Utc);

        ArchivedMessage {
            id,
            content: row.text.clone(),
            html: row.html.clone(),
            avatar: fields.avatar,
            username: fields.username,
            handle: fields.handle,
            timestamp: archived_at,
            message_timestamp: Some(fields.message_timestamp.unwrap_or(archived_at)),
            message_preview: fields.preview,
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        FieldExtractor::new(standard_strategies())
    }
}

/// First http(s) image whose URL mentions "profile"
fn find_avatar(sources: &[String]) -> String {
    sources
        .iter()
        .filter(|src| src.contains("profile"))
        .filter_map(|src| Url::parse(src).ok())
        .find(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
        .unwrap_or_default()
}
