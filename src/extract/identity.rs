/// Display name and handle recovery.
///
/// The host page does not label these fields, so each [`IdentityStrategy`]
/// looks at one kind of signal and may come up empty. [`resolve`] runs them
/// in order and keeps the first usable answer.
use super::RowSnapshot;
use super::timestamp::strip_relative_markers;
use crate::message::DEFAULT_USERNAME;
use regex::Regex;
use std::sync::LazyLock;

static NAME_THEN_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@]+)(@\S+)").expect("valid name/handle regex"));

static HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\S+").expect("valid handle regex"));

/// "Natella, CHOLO and 29 more"
static COMMA_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_.-]+(?:,\s*[A-Za-z0-9_.-]+)*)(\s+and\s+\d+\s+more)?")
        .expect("valid comma list regex")
});

static ENS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([A-Za-z0-9_.-]+\.eth)\b").expect("valid ens regex"));

static BARE_RELATIVE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[smhd]$").expect("valid bare time regex"));

/// Host page strings that are never a display name
const BOILERPLATE: [&str; 3] = ["You accepted", "Message requests", "accepted the request"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub handle: String,
}

impl Identity {
    fn new(username: &str, handle: &str) -> Option<Identity> {
        let username = username.trim();
        if username.is_empty() || username == "You" {
            return None;
        }
        Some(Identity {
            username: username.to_string(),
            handle: handle.trim().to_string(),
        })
    }

    /// Splits an embedded `@handle` out of `text`
    fn from_text(text: &str) -> Option<Identity> {
        match HANDLE.find(text) {
            Some(handle) => Identity::new(&text.replacen(handle.as_str(), "", 1), handle.as_str()),
            None => Identity::new(text, ""),
        }
    }
}

pub trait IdentityStrategy {
    fn name(&self) -> &'static str;
    fn identify(&self, row: &RowSnapshot) -> Option<Identity>;
}

/// Text of the row's labelled link, "Name@handle" style
pub struct LinkText;

impl IdentityStrategy for LinkText {
    fn name(&self) -> &'static str {
        "link-text"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        let text = row.link_text.as_deref()?.trim();
        match NAME_THEN_HANDLE.captures(text) {
            Some(caps) => Identity::new(&caps[1], &caps[2]),
            None => Identity::new(text, ""),
        }
    }
}

/// First rendered line, unless it is a "You ..." status line
pub struct FirstLine;

impl IdentityStrategy for FirstLine {
    fn name(&self) -> &'static str {
        "first-line"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        let line = row.text.lines().next()?.trim();
        if line.contains("accepted") || line.contains("You") {
            return None;
        }
        Identity::from_text(line)
    }
}

/// First bold or `dir="auto"` inline text
pub struct StyledText;

impl IdentityStrategy for StyledText {
    fn name(&self) -> &'static str {
        "styled-text"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        Identity::new(row.styled_text.as_deref()?, "")
    }
}

/// Group conversations render as a name list; the first name is kept later
pub struct CommaList;

impl IdentityStrategy for CommaList {
    fn name(&self) -> &'static str {
        "comma-list"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        COMMA_LIST
            .captures_iter(&row.text)
            .find(|caps| caps[1].contains(',') || caps.get(2).is_some())
            .and_then(|caps| Identity::new(&caps[1], ""))
    }
}

/// Crypto-style `name.eth` display names, only when nothing else qualified
pub struct EnsName;

impl IdentityStrategy for EnsName {
    fn name(&self) -> &'static str {
        "ens-name"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        let caps = ENS_NAME.captures(&row.text)?;
        Identity::new(&caps[1], "")
    }
}

/// Last resort: the shortest text node that could plausibly be a name
pub struct ShortestTextNode;

impl ShortestTextNode {
    fn qualifies(text: &str) -> bool {
        let len = text.chars().count();
        (2..30).contains(&len)
            && !text.starts_with("You")
            && !text.starts_with('·')
            && !text.starts_with('@')
            && !BARE_RELATIVE_TIME.is_match(text)
            && !BOILERPLATE.iter().any(|b| text.contains(b))
    }
}

impl IdentityStrategy for ShortestTextNode {
    fn name(&self) -> &'static str {
        "shortest-text-node"
    }

    fn identify(&self, row: &RowSnapshot) -> Option<Identity> {
        let text = row
            .text_nodes
            .iter()
            .map(|t| t.trim())
            .filter(|t| Self::qualifies(t))
            .min_by_key(|t| t.chars().count())?;
        Identity::from_text(text)
    }
}

pub fn standard_strategies() -> Vec<Box<dyn IdentityStrategy>> {
    vec![
        Box::new(LinkText),
        Box::new(FirstLine),
        Box::new(StyledText),
        Box::new(CommaList),
        Box::new(ShortestTextNode),
        Box::new(EnsName),
    ]
}

/// First strategy with an answer, normalized
pub fn resolve(strategies: &[Box<dyn IdentityStrategy>], row: &RowSnapshot) -> Option<Identity> {
    strategies.iter().find_map(|strategy| {
        let identity = normalize(strategy.identify(row)?)?;
        log::debug!("Identity resolved by {}: {}", strategy.name(), identity.username);
        Some(identity)
    })
}

/// Display identity for a row, "User" when nothing was found
pub fn resolve_or_default(
    strategies: &[Box<dyn IdentityStrategy>],
    row: &RowSnapshot,
) -> (Identity, bool) {
    match resolve(strategies, row) {
        Some(identity) => (identity, true),
        None => (
            Identity {
                username: DEFAULT_USERNAME.to_string(),
                handle: String::new(),
            },
            false,
        ),
    }
}

/// Split "Name @handle", keep the first of a comma list, drop time markers and
/// the handle from the name. None if nothing usable is left.
fn normalize(identity: Identity) -> Option<Identity> {
    let Identity {
        mut username,
        mut handle,
    } = identity;

    if let Some((name, rest)) = username.split_once('@') {
        let rest = rest.split('@').next().unwrap_or_default().trim();
        if !rest.is_empty() {
            handle = format!("@{}", rest);
        }
        username = name.to_string();
    }

    if let Some((first, _)) = username.split_once(',') {
        username = first.to_string();
    }

    username = strip_relative_markers(&username);
    if !handle.is_empty() {
        username = username.replace(&handle, "");
    }
    let username = username.split_whitespace().collect::<Vec<_>>().join(" ");

    Identity::new(&username, &handle)
}
