/// Keeps live conversation rows in step with the stored archive
///
/// The host page owns the list and recycles its nodes, so visibility is
/// re-derived from store membership whenever rows appear or the store changes.
use crate::config::ArchiverConfig;
use crate::scheduler::{Debouncer, Scheduler};
use crate::session::{SessionHandle, UpdateToken};
use crate::storage::{ARCHIVE_KEY, StorageChange};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::rc::Rc;

/// One conversation row as rendered by the host page
pub trait ConversationRow {
    fn message_id(&self) -> String;

    /// Per-node marker; a node recycled by the host page starts unseen again
    fn is_seen(&self) -> bool;
    fn mark_seen(&self);

    fn has_archive_button(&self) -> bool;
    fn inject_archive_button(&self);

    fn is_archived(&self) -> bool;
    fn set_archived(&self, archived: bool);

    /// Make the browser drop any cached visual state for the row
    fn force_repaint(&self);
}

/// The parts of the host page the engine touches
pub trait PageHost {
    type Row: ConversationRow + 'static;

    fn rows(&self) -> Vec<Self::Row>;

    /// False on routes where rows must be left alone
    fn decorates_rows(&self) -> bool;

    /// Returns whether a toggle was injected by this call
    fn inject_panel_toggle(&self) -> bool;

    /// Scroll the virtualized container (or window) by one pixel and back
    fn nudge_scroll(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Unseen,
    Visible,
    Archived,
}

pub fn row_state(row: &impl ConversationRow) -> RowState {
    if !row.is_seen() {
        RowState::Unseen
    } else if row.is_archived() {
        RowState::Archived
    } else {
        RowState::Visible
    }
}

/// DOM mutations that added at least one node matching the observe predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationBatch {
    pub matched: usize,
}

impl MutationBatch {
    pub fn is_relevant(&self) -> bool {
        self.matched > 0
    }
}

/// Apply membership to one row; repaint when it becomes visible again
fn apply_membership(row: &impl ConversationRow, archived: bool) -> bool {
    let changed = row.is_archived() != archived;
    row.set_archived(archived);
    if changed && !archived {
        row.force_repaint();
    }
    changed
}

/// A visibility refresh over a fixed set of rows, done a chunk at a time
pub struct VisibilityPass<R> {
    rows: Vec<R>,
    archived: HashSet<String>,
    cursor: usize,
    batch_size: usize,
}

impl<R: ConversationRow> VisibilityPass<R> {
    pub fn new(rows: Vec<R>, archived: HashSet<String>, batch_size: usize) -> Self {
        VisibilityPass {
            rows,
            archived,
            cursor: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// Process the next chunk; returns whether rows remain
    pub fn step(&mut self) -> bool {
        let end = (self.cursor + self.batch_size).min(self.rows.len());
        for row in &self.rows[self.cursor..end] {
            apply_membership(row, self.archived.contains(&row.message_id()));
        }
        self.cursor = end;
        self.cursor < self.rows.len()
    }
}

fn run_pass<R: ConversationRow + 'static>(scheduler: Rc<dyn Scheduler>, mut pass: VisibilityPass<R>) {
    if pass.step() {
        let next = Rc::clone(&scheduler);
        scheduler.schedule(0, Box::new(move || run_pass(next, pass)));
    }
}

pub struct SyncEngine<H: PageHost> {
    host: Rc<H>,
    session: SessionHandle,
    scheduler: Rc<dyn Scheduler>,
    debouncer: Debouncer,
    batch_size: usize,
}

impl<H: PageHost> SyncEngine<H> {
    pub fn new(
        host: Rc<H>,
        session: SessionHandle,
        scheduler: Rc<dyn Scheduler>,
        config: &ArchiverConfig,
    ) -> Self {
        SyncEngine {
            debouncer: Debouncer::new(Rc::clone(&scheduler), config.debounce_ms),
            host,
            session,
            scheduler,
            batch_size: config.batch_size,
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// Give unseen rows their archive button and initial visibility
    pub fn decorate_rows(&self, archived: &HashSet<String>) -> usize {
        if !self.host.decorates_rows() {
            return 0;
        }

        let mut decorated = 0;
        for row in self.host.rows().iter().filter(|row| !row.is_seen()) {
            if !row.has_archive_button() {
                row.inject_archive_button();
            }
            apply_membership(row, archived.contains(&row.message_id()));
            row.mark_seen();
            decorated += 1;
        }
        if decorated > 0 {
            log::debug!("Decorated {} conversation rows", decorated);
        }
        decorated
    }

    /// Debounced mutation work: decorate new rows, make sure the toggle exists
    pub fn rescan(&self, archived: &HashSet<String>) -> usize {
        let decorated = self.decorate_rows(archived);
        if self.host.inject_panel_toggle() {
            log::debug!("Injected archive panel toggle");
        }
        decorated
    }

    /// Re-apply visibility to every present row, yielding between chunks
    pub fn refresh_visibility(&self, archived: HashSet<String>) {
        let rows = self.host.rows();
        log::debug!("Refreshing visibility of {} rows", rows.len());
        run_pass(
            Rc::clone(&self.scheduler),
            VisibilityPass::new(rows, archived, self.batch_size),
        );
    }

    pub fn hide(&self, row: &H::Row) {
        apply_membership(row, true);
    }

    /// Show rows for a restored id and shake the virtualized list into redrawing
    pub fn reveal(&self, id: &str) -> usize {
        let mut revealed = 0;
        for row in self.host.rows().iter().filter(|row| row.message_id() == id) {
            row.set_archived(false);
            row.force_repaint();
            revealed += 1;
        }
        self.host.nudge_scroll();
        revealed
    }

    /// Schedule a debounced rescan for a relevant batch. Returns whether it did.
    pub fn on_mutations(&self, batch: &MutationBatch, rescan: impl FnOnce() + 'static) -> bool {
        if self.session.guard().is_active() || !batch.is_relevant() {
            return false;
        }
        let guard = self.session.guard().clone();
        self.debouncer.call(move || {
            if !guard.is_active() {
                rescan();
            }
        });
        true
    }

    /// Archive changes from other contexts need a resync; our own do not
    pub fn should_resync(&self, change: &StorageChange) -> bool {
        if !change.touches(ARCHIVE_KEY) {
            return false;
        }
        if self.session.guard().is_active() {
            log::debug!("Ignoring archive change caused by this page");
            return false;
        }
        true
    }

    /// Drop `token` on a later turn, after the change event of the write it
    /// covered has been delivered to this page
    pub fn release_later(&self, token: UpdateToken) {
        self.scheduler.schedule(0, Box::new(move || drop(token)));
    }

    /// React to every batch of the mutation feed until it ends
    pub async fn follow<F>(&self, mut feed: F, rescan: Rc<dyn Fn()>)
    where
        F: Stream<Item = MutationBatch> + Unpin,
    {
        while let Some(batch) = feed.next().await {
            let rescan = Rc::clone(&rescan);
            self.on_mutations(&batch, move || rescan());
        }
    }
}
