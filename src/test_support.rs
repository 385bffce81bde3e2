/// Fixtures shared by unit tests
use crate::message::ArchivedMessage;
use crate::sync::{ConversationRow, PageHost};
use chrono::{TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub fn sample_message(id: &str, username: &str) -> ArchivedMessage {
    ArchivedMessage {
        id: id.to_string(),
        content: format!("{}\nhello", username),
        html: String::new(),
        avatar: String::new(),
        username: username.to_string(),
        handle: String::new(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap(),
        message_timestamp: None,
        message_preview: "hello".to_string(),
    }
}

#[derive(Debug, Default)]
struct RowState {
    id: String,
    seen: bool,
    buttons: u32,
    archived: bool,
    repaints: u32,
}

/// Conversation row; clones share state the way DOM handles share a node
#[derive(Debug, Clone, Default)]
pub struct FakeRow(Rc<RefCell<RowState>>);

impl FakeRow {
    pub fn new(id: &str) -> Self {
        FakeRow(Rc::new(RefCell::new(RowState {
            id: id.to_string(),
            ..Default::default()
        })))
    }

    pub fn buttons(&self) -> u32 {
        self.0.borrow().buttons
    }

    pub fn repaints(&self) -> u32 {
        self.0.borrow().repaints
    }
}

impl ConversationRow for FakeRow {
    fn message_id(&self) -> String {
        self.0.borrow().id.clone()
    }

    fn is_seen(&self) -> bool {
        self.0.borrow().seen
    }

    fn mark_seen(&self) {
        self.0.borrow_mut().seen = true;
    }

    fn has_archive_button(&self) -> bool {
        self.0.borrow().buttons > 0
    }

    fn inject_archive_button(&self) {
        self.0.borrow_mut().buttons += 1;
    }

    fn is_archived(&self) -> bool {
        self.0.borrow().archived
    }

    fn set_archived(&self, archived: bool) {
        self.0.borrow_mut().archived = archived;
    }

    fn force_repaint(&self) {
        self.0.borrow_mut().repaints += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakePage {
    rows: RefCell<Vec<FakeRow>>,
    excluded: Cell<bool>,
    toggles: Cell<u32>,
    nudges: Cell<u32>,
}

impl FakePage {
    pub fn with_rows(ids: &[&str]) -> Rc<Self> {
        let page = FakePage::default();
        page.replace_rows(ids);
        Rc::new(page)
    }

    /// Simulate the host page re-rendering its list with fresh nodes
    pub fn replace_rows(&self, ids: &[&str]) {
        *self.rows.borrow_mut() = ids.iter().map(|id| FakeRow::new(id)).collect();
    }

    pub fn set_decorates(&self, decorates: bool) {
        self.excluded.set(!decorates);
    }

    pub fn nudges(&self) -> u32 {
        self.nudges.get()
    }

    pub fn toggles(&self) -> u32 {
        self.toggles.get()
    }
}

impl PageHost for FakePage {
    type Row = FakeRow;

    fn rows(&self) -> Vec<FakeRow> {
        self.rows.borrow().clone()
    }

    fn decorates_rows(&self) -> bool {
        !self.excluded.get()
    }

    fn inject_panel_toggle(&self) -> bool {
        if self.toggles.get() > 0 {
            return false;
        }
        self.toggles.set(1);
        true
    }

    fn nudge_scroll(&self) {
        self.nudges.set(self.nudges.get() + 1);
    }
}
