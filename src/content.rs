/// Content script: wires extraction, storage, sync and the panel together
use crate::bridge::{ChromeStorage, StorageSubscription};
use crate::config::ArchiverConfig;
use crate::dom::{BrowserScheduler, DomPage, DomRow, observe};
use crate::error::{ArchiveError, Result};
use crate::extract::FieldExtractor;
use crate::message::PanelPosition;
use crate::panel::{ArchivePanel, ArchivePanelProps};
use crate::session::SessionHandle;
use crate::storage::ArchiveStore;
use crate::sync::{ConversationRow, PageHost, SyncEngine};
use chrono::Local;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Window};
use yew::{AppHandle, Callback};

/// The mounted panel and the node it lives in
struct PanelMount {
    host: Element,
    app: AppHandle<ArchivePanel>,
}

impl PanelMount {
    fn unmount(self) {
        self.app.destroy();
        self.host.remove();
    }
}

pub struct ContentScript {
    page: Rc<DomPage>,
    engine: SyncEngine<DomPage>,
    extractor: FieldExtractor,
    store: ArchiveStore<ChromeStorage>,
    session: SessionHandle,
    panel: RefCell<Option<PanelMount>>,
    subscription: RefCell<Option<StorageSubscription>>,
}

impl ContentScript {
    pub async fn start(window: Window) -> Result<Rc<ContentScript>> {
        let config = ArchiverConfig::load(&ChromeStorage).await;
        let page = Rc::new(DomPage::new(window.clone(), config.clone())?);
        if let Err(e) = page.install_styles() {
            log::warn!("Could not install styles: {}", e);
        }

        let session = SessionHandle::new();
        let scheduler = Rc::new(BrowserScheduler::new(window));
        let engine = SyncEngine::new(Rc::clone(&page), session.clone(), scheduler, &config);

        let script = Rc::new(ContentScript {
            page: Rc::clone(&page),
            engine,
            extractor: FieldExtractor::default(),
            store: ArchiveStore::new(ChromeStorage),
            session,
            panel: RefCell::new(None),
            subscription: RefCell::new(None),
        });

        let weak = Rc::downgrade(&script);
        page.on_archive(move |row| {
            if let Some(script) = weak.upgrade() {
                spawn_local(async move { script.archive_row(row).await });
            }
        });

        let weak = Rc::downgrade(&script);
        page.on_toggle(move || {
            if let Some(script) = weak.upgrade() {
                spawn_local(async move { script.toggle_panel().await });
            }
        });

        let weak = Rc::downgrade(&script);
        let subscription = StorageSubscription::subscribe(move |change| {
            let Some(script) = weak.upgrade() else {
                return;
            };
            if script.engine.should_resync(&change) {
                spawn_local(async move { script.resync().await });
            }
        });
        *script.subscription.borrow_mut() = Some(subscription);

        script.rescan().await;
        script.follow_mutations()?;

        log::info!("Archiver ready");
        Ok(script)
    }

    fn follow_mutations(self: &Rc<Self>) -> Result<()> {
        let body = self
            .page
            .document()
            .body()
            .ok_or_else(|| ArchiveError::Bridge("document has no body".to_string()))?;
        let page = Rc::clone(&self.page);
        let feed = observe(&body, move |element| page.holds_row(element))?;

        let weak = Rc::downgrade(self);
        let rescan: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(script) = weak.upgrade() {
                spawn_local(async move { script.rescan().await });
            }
        });

        // The feed never ends, so this task keeps the script alive for the page
        let script = Rc::clone(self);
        spawn_local(async move { script.engine.follow(feed, rescan).await });
        Ok(())
    }

    /// Decorate rows that appeared since the last scan
    pub async fn rescan(&self) {
        match self.store.load_archive().await {
            Ok(archive) => {
                self.engine.rescan(&archive.ids());
            }
            Err(e) => log::warn!("Rescan skipped, archive unreadable: {}", e),
        }
    }

    /// Another context changed the archive; re-derive every row's visibility
    pub async fn resync(&self) {
        match self.store.load_archive().await {
            Ok(archive) => self.engine.refresh_visibility(archive.ids()),
            Err(e) => log::warn!("Resync skipped, archive unreadable: {}", e),
        }
    }

    pub async fn archive_row(&self, row: DomRow) {
        let id = row.message_id();
        let message = self
            .extractor
            .archive(&row.snapshot(), id.clone(), Local::now().fixed_offset());

        let token = self.session.guard().enter();
        match self.store.append(message).await {
            Ok(true) => log::info!("Archived conversation {:?}", id),
            Ok(false) => log::debug!("Conversation {:?} was already archived", id),
            Err(e) => {
                log::warn!("Failed to archive conversation: {}", e);
                return;
            }
        }
        self.engine.hide(&row);
        self.engine.release_later(token);
    }

    pub async fn restore(&self, id: String) {
        let token = self.session.guard().enter();
        match self.store.remove(&id).await {
            Ok(Some(_)) => log::info!("Restored conversation {:?}", id),
            Ok(None) => log::debug!("Conversation {:?} was not archived", id),
            Err(e) => {
                log::warn!("Failed to restore conversation: {}", e);
                return;
            }
        }
        let revealed = self.engine.reveal(&id);
        log::debug!("Revealed {} rows for {:?}", revealed, id);
        self.engine.release_later(token);
    }

    pub async fn clear(&self) {
        let token = self.session.guard().enter();
        if let Err(e) = self.store.clear().await {
            log::warn!("Failed to clear archive: {}", e);
            return;
        }
        log::info!("Archive cleared");
        self.engine.refresh_visibility(Default::default());
        self.engine.host().nudge_scroll();
        self.engine.release_later(token);
    }

    pub async fn save_position(&self, position: PanelPosition) {
        if let Err(e) = self.store.save_position(position).await {
            log::warn!("Failed to save panel position: {}", e);
        }
    }

    pub async fn toggle_panel(self: Rc<Self>) {
        if self.close_panel() {
            return;
        }

        match self.store.load_position().await {
            Ok(position) => self.session.set_panel_position(position),
            Err(e) => log::warn!("Failed to load panel position: {}", e),
        }
        // A second toggle may have opened it while the position loaded
        if self.panel.borrow().is_some() {
            return;
        }
        match self.mount_panel() {
            Ok(mount) => *self.panel.borrow_mut() = Some(mount),
            Err(e) => log::warn!("Could not open archive panel: {}", e),
        }
    }

    /// Returns whether a panel was open
    pub fn close_panel(&self) -> bool {
        let mount = self.panel.borrow_mut().take();
        match mount {
            Some(mount) => {
                mount.unmount();
                true
            }
            None => false,
        }
    }

    fn mount_panel(self: &Rc<Self>) -> Result<PanelMount> {
        let document = self.page.document();
        let host = document.create_element("div").map_err(ArchiveError::bridge)?;
        let body = document
            .body()
            .ok_or_else(|| ArchiveError::Bridge("document has no body".to_string()))?;
        body.append_child(&host).map_err(ArchiveError::bridge)?;

        let props = ArchivePanelProps {
            session: self.session.clone(),
            on_restore: self.callback(|script, id: String| async move { script.restore(id).await }),
            on_clear: self.callback(|script, _: ()| async move { script.clear().await }),
            on_close: self.callback(|script, _: ()| async move {
                script.close_panel();
            }),
            on_move: self.callback(|script, position: PanelPosition| async move {
                script.save_position(position).await
            }),
        };
        let app = yew::Renderer::<ArchivePanel>::with_root_and_props(host.clone(), props)
            .render();

        Ok(PanelMount { host, app })
    }

    /// Yew callback running `f` on the event loop, outside the emitting render
    fn callback<T, F, Fut>(self: &Rc<Self>, f: F) -> Callback<T>
    where
        T: 'static,
        F: Fn(Rc<ContentScript>, T) -> Fut + 'static,
        Fut: std::future::Future<Output = ()> + 'static,
    {
        let weak = Rc::downgrade(self);
        Callback::from(move |value: T| {
            if let Some(script) = weak.upgrade() {
                spawn_local(f(script, value));
            }
        })
    }
}
