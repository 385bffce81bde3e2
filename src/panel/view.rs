/// What the archive panel shows, independent of how it is drawn.
use crate::extract::preview::clean_preview;
use crate::message::{ACCEPTED_REQUEST, ArchivedMessage, DEFAULT_USERNAME, PanelPosition};
use crate::session::SortOrder;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use regex::RegexBuilder;

/// Records whose username, handle or preview contain `query` (already lowercased)
pub fn filter_messages<'a>(messages: &'a [ArchivedMessage], query: &str) -> Vec<&'a ArchivedMessage> {
    if query.is_empty() {
        return messages.iter().collect();
    }
    messages
        .iter()
        .filter(|m| {
            m.username.to_lowercase().contains(query)
                || m.handle.to_lowercase().contains(query)
                || m.message_preview.to_lowercase().contains(query)
        })
        .collect()
}

/// Stable: equal timestamps keep their stored order in both directions
pub fn sort_messages(messages: &mut [&ArchivedMessage], order: SortOrder) {
    match order {
        SortOrder::Newest => messages.sort_by(|a, b| b.best_timestamp().cmp(&a.best_timestamp())),
        SortOrder::Oldest => messages.sort_by(|a, b| a.best_timestamp().cmp(&b.best_timestamp())),
    }
}

/// "now", "5m", "3h", "May 14", or "May 2023" for earlier years
pub fn relative_time(then: DateTime<Utc>, now: DateTime<FixedOffset>) -> String {
    let seconds = (now.with_timezone(&Utc) - then).num_seconds();

    if seconds < 24 * 60 * 60 {
        if seconds < 60 {
            return "now".to_string();
        }
        let minutes = seconds / 60;
        if minutes < 60 {
            return format!("{}m", minutes);
        }
        return format!("{}h", minutes / 60);
    }

    let local = then.with_timezone(now.offset());
    if now.year() > local.year() {
        local.format("%b %Y").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    fn plain(text: &str) -> Segment {
        Segment {
            text: text.to_string(),
            highlighted: false,
        }
    }
}

/// Split `text` around case-insensitive literal matches of `query`
pub fn highlight(text: &str, query: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    let matcher = match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(matcher) if !query.is_empty() => matcher,
        _ => return vec![Segment::plain(text)],
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for found in matcher.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::plain(&text[last..found.start()]));
        }
        segments.push(Segment {
            text: found.as_str().to_string(),
            highlighted: true,
        });
        last = found.end();
    }
    if last < text.len() {
        segments.push(Segment::plain(&text[last..]));
    }
    segments
}

/// One line of the archive list
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub avatar: String,
    pub username: Vec<Segment>,
    pub handle: Vec<Segment>,
    pub preview: Vec<Segment>,
    pub relative_time: String,
}

pub fn list_entries(
    messages: &[ArchivedMessage],
    query: &str,
    order: SortOrder,
    now: DateTime<FixedOffset>,
) -> Vec<ListEntry> {
    let mut visible = filter_messages(messages, query);
    sort_messages(&mut visible, order);

    visible
        .into_iter()
        .map(|m| {
            let username = if m.username.is_empty() {
                DEFAULT_USERNAME
            } else {
                m.username.as_str()
            };
            let preview = if m.message_preview.is_empty() {
                ACCEPTED_REQUEST
            } else {
                m.message_preview.as_str()
            };
            let preview = clean_preview(preview, &m.handle);

            ListEntry {
                id: m.id.clone(),
                avatar: m.avatar.clone(),
                username: highlight(username, query),
                handle: highlight(&m.handle, query),
                preview: highlight(&preview, query),
                relative_time: relative_time(m.best_timestamp(), now),
            }
        })
        .collect()
}

/// Empty-list message, distinguishing "nothing stored" from "nothing matched"
pub fn empty_message(query: &str) -> &'static str {
    if query.is_empty() {
        "No archived messages"
    } else {
        "No matches found. Try a different search term."
    }
}

/// Document events that finish a drag; leaving the window counts as a drop
pub const DRAG_END_EVENTS: [&str; 2] = ["mouseup", "mouseleave"];

/// Pointer offset from the panel's top-left while a drag is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    offset: Option<(f64, f64)>,
}

impl DragState {
    pub fn begin(&mut self, pointer: (f64, f64), panel_top_left: (f64, f64)) {
        self.offset = Some((pointer.0 - panel_top_left.0, pointer.1 - panel_top_left.1));
    }

    /// New panel position, or None when not dragging
    pub fn drag_to(&self, pointer: (f64, f64)) -> Option<PanelPosition> {
        let (dx, dy) = self.offset?;
        Some(PanelPosition {
            left: pointer.0 - dx,
            top: pointer.1 - dy,
        })
    }

    /// Returns whether a drag was in progress
    pub fn end(&mut self) -> bool {
        self.offset.take().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.offset.is_some()
    }
}

/// Inline placement for the panel root: saved position, else pinned top-right
pub fn placement_style(position: Option<PanelPosition>) -> String {
    match position {
        Some(p) => format!("position: fixed; left: {}px; top: {}px; right: auto; bottom: auto;", p.left, p.top),
        None => "position: fixed; top: 80px; right: 20px;".to_string(),
    }
}
