/// Short message text shown under the name in the archive list.
use super::identity::Identity;
use super::timestamp::strip_relative_markers;
use crate::message::ACCEPTED_REQUEST;
use regex::Regex;
use std::sync::LazyLock;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_.-]+").expect("valid mention regex"));

/// Lines after the first that do not repeat the sender, cleaned up.
/// `identity` is None when the sender could not be recovered.
pub fn extract_preview(text: &str, identity: Option<&Identity>) -> String {
    if text.contains(ACCEPTED_REQUEST) {
        return ACCEPTED_REQUEST.to_string();
    }

    let repeats_sender = |line: &str| match identity {
        Some(identity) => {
            line.contains(identity.username.as_str())
                || (!identity.handle.is_empty() && line.contains(identity.handle.as_str()))
        }
        None => false,
    };

    let body = text
        .lines()
        .skip(1)
        .filter(|line| !repeats_sender(line))
        .collect::<Vec<_>>()
        .join(" ");

    let preview = clean_preview(&body, "");
    if preview.is_empty() {
        ACCEPTED_REQUEST.to_string()
    } else {
        preview
    }
}

/// Drop the handle, other mentions and time markers, collapse whitespace
pub fn clean_preview(preview: &str, handle: &str) -> String {
    let without_handle = if handle.is_empty() {
        preview.to_string()
    } else {
        preview.replace(handle, "")
    };
    let without_mentions = MENTION.replace_all(&without_handle, "");
    strip_relative_markers(&without_mentions)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> Identity {
        Identity {
            username: "Jane Doe".to_string(),
            handle: "@janedoe".to_string(),
        }
    }

    #[test]
    fn test_preview_skips_header_line() {
        let text = "Jane Doe @janedoe · 2h\nhey are you free";
        assert_eq!(extract_preview(text, Some(&jane())), "hey are you free");
    }

    #[test]
    fn test_preview_drops_lines_repeating_sender() {
        let text = "Jane Doe\n@janedoe\n· 2h\nlunch   tomorrow?\nJane Doe reacted";
        assert_eq!(extract_preview(text, Some(&jane())), "lunch tomorrow?");
    }

    #[test]
    fn test_preview_without_identity_keeps_all_lines() {
        assert_eq!(extract_preview("header\nping @bob · 5m", None), "ping");
    }

    #[test]
    fn test_accepted_request() {
        let text = "Jane Doe\nYou accepted the request";
        assert_eq!(extract_preview(text, Some(&jane())), ACCEPTED_REQUEST);
        assert_eq!(extract_preview("Jane Doe", Some(&jane())), ACCEPTED_REQUEST);
    }

    #[test]
    fn test_clean_preview() {
        assert_eq!(clean_preview("@janedoe  hi\tthere · 3d", "@janedoe"), "hi there");
        assert_eq!(clean_preview("thanks @bob.eth!", ""), "thanks !");
    }
}
