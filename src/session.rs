/// Per-page UI state shared by the panel and the sync engine
use crate::message::PanelPosition;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Marks writes this page started, so the change notifications they cause
/// can be told apart from writes made by other contexts.
#[derive(Debug, Clone, Default)]
pub struct UpdateGuard {
    depth: Rc<Cell<u32>>,
}

impl UpdateGuard {
    /// Active until the returned token is dropped; hold it across the write
    pub fn enter(&self) -> UpdateToken {
        self.depth.set(self.depth.get() + 1);
        UpdateToken {
            depth: Rc::clone(&self.depth),
        }
    }

    pub fn is_active(&self) -> bool {
        self.depth.get() > 0
    }
}

#[must_use = "the guard is released when the token is dropped"]
pub struct UpdateToken {
    depth: Rc<Cell<u32>>,
}

impl Drop for UpdateToken {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub sort_order: SortOrder,
    /// Trimmed and lowercased
    pub search_query: String,
    pub panel_position: Option<PanelPosition>,
}

/// Shared handle to the session; equality is identity so it can be a Yew prop
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    state: Rc<RefCell<SessionState>>,
    guard: UpdateGuard,
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> &UpdateGuard {
        &self.guard
    }

    pub fn sort_order(&self) -> SortOrder {
        self.state.borrow().sort_order
    }

    /// Returns false if the order was already selected
    pub fn set_sort_order(&self, order: SortOrder) -> bool {
        let mut state = self.state.borrow_mut();
        if state.sort_order == order {
            return false;
        }
        state.sort_order = order;
        true
    }

    pub fn search_query(&self) -> String {
        self.state.borrow().search_query.clone()
    }

    pub fn set_search_query(&self, raw: &str) {
        self.state.borrow_mut().search_query = raw.trim().to_lowercase();
    }

    pub fn panel_position(&self) -> Option<PanelPosition> {
        self.state.borrow().panel_position
    }

    pub fn set_panel_position(&self, position: Option<PanelPosition>) {
        self.state.borrow_mut().panel_position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_nests_and_releases() {
        let guard = UpdateGuard::default();
        assert!(!guard.is_active());

        let outer = guard.enter();
        let inner = guard.enter();
        drop(inner);
        assert!(guard.is_active());

        drop(outer);
        assert!(!guard.is_active());
    }

    #[test]
    fn test_guard_is_shared_between_clones() {
        let session = SessionHandle::new();
        let other = session.clone();

        let _token = session.guard().enter();

        assert!(other.guard().is_active());
        assert_eq!(session, other);
        assert_ne!(session, SessionHandle::new());
    }

    #[test]
    fn test_search_query_is_normalized() {
        let session = SessionHandle::new();
        session.set_search_query("  JaNe ");
        assert_eq!(session.search_query(), "jane");
    }

    #[test]
    fn test_set_sort_order_reports_change() {
        let session = SessionHandle::new();
        assert!(!session.set_sort_order(SortOrder::Newest));
        assert!(session.set_sort_order(SortOrder::Oldest));
        assert_eq!(session.sort_order(), SortOrder::Oldest);
    }
}
