/// The host page as seen through web-sys
use crate::config::ArchiverConfig;
use crate::error::{ArchiveError, Result};
use crate::extract::RowSnapshot;
use crate::sync::{ConversationRow, PageHost};
use js_sys::WeakSet;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement, MouseEvent, Node, Window};

pub const ARCHIVE_BUTTON_CLASS: &str = "archive-btn";
pub const PANEL_TOGGLE_ID: &str = "archiveListBtn";
const ARCHIVED_ATTRIBUTE: &str = "data-archived";
const STYLE_ID: &str = "archiverStyles";

const ARCHIVE_ICON: &str = "\u{1f4e5}";
const BOOKMARK_SVG: &str = r#"<svg viewBox="0 0 24 24" style="width: 20px; height: 20px; fill: currentColor;"><g><path d="M19.9 23.5c-.2 0-.3 0-.4-.1L12 17.9l-7.5 5.4c-.2.2-.5.2-.8.1-.2-.1-.4-.4-.4-.7V5.6c0-1.2 1-2.2 2.2-2.2h12.8c1.2 0 2.2 1 2.2 2.2v17.1c0 .3-.2.5-.4.7 0 .1-.1.1-.2.1z"></path></g></svg>"#;

const STYLES: &str = r#"
.archive-btn {
    position: absolute; bottom: 5px; right: 5px; width: 32px; height: 32px;
    font-size: 16px; background-color: #1d9bf0; color: white; border: none;
    border-radius: 50%; cursor: pointer; display: flex; align-items: center;
    justify-content: center; box-shadow: 0 2px 4px rgba(0,0,0,0.2);
    opacity: 0; transition: opacity 0.2s ease-in-out;
}
[data-archiver-row]:hover .archive-btn { opacity: 1; }
.archive-btn:hover { background-color: #1a8cd8 !important; }
#archiveListBtn {
    margin-left: 10px; border: none; background: none; cursor: pointer;
    border-radius: 50%; width: 36px; height: 36px; display: flex;
    align-items: center; justify-content: center; color: inherit;
}
#archiveListBtn:hover { background-color: rgba(29, 155, 240, 0.1); }
#archivePanel {
    --archiver-bg: #ffffff; --archiver-hover: #f7f9f9; --archiver-fg: #0f1419;
    --archiver-muted: #536471; --archiver-border: #eff3f4;
    width: 380px; max-height: 600px; display: flex; flex-direction: column;
    background: var(--archiver-bg); color: var(--archiver-fg);
    border: 1px solid var(--archiver-border); border-radius: 16px;
    box-shadow: 0 4px 12px rgba(0,0,0,0.15); z-index: 10000; overflow: hidden;
    font-family: "TwitterChirp", -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
}
@media (prefers-color-scheme: dark) {
    #archivePanel { --archiver-bg: #15202b; --archiver-hover: #1e2732; --archiver-fg: #e7e9ea; --archiver-muted: #8899a6; --archiver-border: #38444d; }
}
html.dark #archivePanel, html[data-color-mode="dark"] #archivePanel, body.night-mode #archivePanel {
    --archiver-bg: #15202b; --archiver-hover: #1e2732; --archiver-fg: #e7e9ea; --archiver-muted: #8899a6; --archiver-border: #38444d;
}
#archiveHeader { display: flex; align-items: center; justify-content: space-between; padding: 12px 16px; cursor: move; user-select: none; border-bottom: 1px solid var(--archiver-border); }
#archiveHeader h3 { margin: 0; font-size: 20px; font-weight: 800; }
.archiver-controls { display: flex; gap: 8px; padding: 8px 16px; align-items: center; }
.archiver-search { flex: 1; position: relative; }
.archiver-search input { width: 100%; box-sizing: border-box; padding: 8px 28px 8px 12px; border-radius: 9999px; border: 1px solid var(--archiver-border); background: transparent; color: inherit; }
.archiver-search button { position: absolute; right: 6px; top: 50%; transform: translateY(-50%); border: none; background: none; color: var(--archiver-muted); cursor: pointer; }
.sort-btn, .refresh-btn, .clear-btn, .close-btn { border: 1px solid var(--archiver-border); background: transparent; color: inherit; border-radius: 9999px; padding: 4px 12px; cursor: pointer; }
.sort-btn { transition: background-color 0.2s, color 0.2s; }
.sort-btn.active, .sort-btn:hover { background-color: #1d9bf0; color: white; }
.refresh-btn { transition: transform 0.3s, background-color 0.2s; }
.refresh-btn:hover { background-color: #1a8cd8; color: white; transform: rotate(180deg); }
.archiver-list { overflow-y: auto; flex: 1; }
.archiver-entry { display: flex; padding: 12px 16px; gap: 12px; border-bottom: 1px solid var(--archiver-border); }
.archiver-entry:hover { background-color: var(--archiver-hover); }
.archiver-entry img { width: 40px; height: 40px; border-radius: 50%; }
.archiver-entry .body { flex: 1; min-width: 0; }
.archiver-entry .meta { color: var(--archiver-muted); font-size: 14px; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
.archiver-entry .preview { color: var(--archiver-muted); font-size: 14px; margin-top: 2px; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
.archiver-entry mark { background-color: rgba(29, 155, 240, 0.3); color: inherit; border-radius: 2px; }
.restore-btn { background-color: #1d9bf0; color: white; border: none; border-radius: 9999px; padding: 6px 16px; font-size: 14px; font-weight: 700; cursor: pointer; align-self: center; }
.restore-btn:hover { background-color: #1a8cd8 !important; }
.archiver-empty { padding: 24px 16px; text-align: center; color: var(--archiver-muted); }
"#;

type RowHandler = Rc<dyn Fn(DomRow)>;
type ToggleHandler = Rc<dyn Fn()>;

#[derive(Default)]
struct Handlers {
    archive: RefCell<Option<RowHandler>>,
    toggle: RefCell<Option<ToggleHandler>>,
}

pub struct DomPage {
    window: Window,
    document: Document,
    config: Rc<ArchiverConfig>,
    // Node identity survives attribute churn but not re-creation
    seen: WeakSet,
    handlers: Rc<Handlers>,
}

impl DomPage {
    pub fn new(window: Window, config: ArchiverConfig) -> Result<DomPage> {
        let document = window
            .document()
            .ok_or_else(|| ArchiveError::Bridge("window has no document".to_string()))?;
        Ok(DomPage {
            window,
            document,
            config: Rc::new(config),
            seen: WeakSet::new(),
            handlers: Rc::new(Handlers::default()),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn on_archive(&self, handler: impl Fn(DomRow) + 'static) {
        *self.handlers.archive.borrow_mut() = Some(Rc::new(handler));
    }

    pub fn on_toggle(&self, handler: impl Fn() + 'static) {
        *self.handlers.toggle.borrow_mut() = Some(Rc::new(handler));
    }

    /// Whether `element` is, or contains, a conversation row
    pub fn holds_row(&self, element: &Element) -> bool {
        let selector = &self.config.row_selector;
        element.matches(selector).unwrap_or(false)
            || matches!(element.query_selector(selector), Ok(Some(_)))
    }

    pub fn install_styles(&self) -> Result<()> {
        if self.document.get_element_by_id(STYLE_ID).is_some() {
            return Ok(());
        }
        let style = self.document.create_element("style").map_err(ArchiveError::bridge)?;
        style.set_id(STYLE_ID);
        style.set_text_content(Some(STYLES));
        let head = self
            .document
            .head()
            .ok_or_else(|| ArchiveError::Bridge("document has no head".to_string()))?;
        head.append_child(&style).map_err(ArchiveError::bridge)?;
        Ok(())
    }

    fn row(&self, element: HtmlElement) -> DomRow {
        DomRow {
            element,
            document: self.document.clone(),
            seen: self.seen.clone(),
            config: Rc::clone(&self.config),
            handlers: Rc::clone(&self.handlers),
        }
    }

    fn create_toggle(&self) -> Result<HtmlElement> {
        let button: HtmlElement = self
            .document
            .create_element("button")
            .map_err(ArchiveError::bridge)?
            .unchecked_into();
        button.set_id(PANEL_TOGGLE_ID);
        button.set_title("Toggle Archive Panel");
        button.set_inner_html(BOOKMARK_SVG);

        let handlers = Rc::clone(&self.handlers);
        let on_click = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            event.stop_propagation();
            let handler = handlers.toggle.borrow().clone();
            if let Some(handler) = handler {
                handler();
            }
        });
        button
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(ArchiveError::bridge)?;
        // Lives as long as the button, which the page never hands back
        on_click.forget();
        Ok(button)
    }
}

impl PageHost for DomPage {
    type Row = DomRow;

    fn rows(&self) -> Vec<DomRow> {
        let nodes = match self.document.query_selector_all(&self.config.row_selector) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::warn!("Row selector {:?} failed: {:?}", self.config.row_selector, e);
                return Vec::new();
            }
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .map(|element| self.row(element))
            .collect()
    }

    fn decorates_rows(&self) -> bool {
        match self.window.location().pathname() {
            Ok(path) => !path.contains(&self.config.excluded_path),
            Err(_) => true,
        }
    }

    fn inject_panel_toggle(&self) -> bool {
        if self.document.get_element_by_id(PANEL_TOGGLE_ID).is_some() {
            return false;
        }
        let Some(anchor_parent) = self
            .document
            .query_selector(&self.config.settings_selector)
            .ok()
            .flatten()
            .and_then(|anchor| anchor.parent_element())
        else {
            return false;
        };

        match self.create_toggle() {
            Ok(button) => anchor_parent.append_child(&button).is_ok(),
            Err(e) => {
                log::warn!("Could not create panel toggle: {}", e);
                false
            }
        }
    }

    fn nudge_scroll(&self) {
        let container = self
            .document
            .query_selector(&self.config.scroll_container_selector)
            .ok()
            .flatten();
        match container {
            Some(container) => {
                container.set_scroll_top(container.scroll_top() + 1);
                container.set_scroll_top(container.scroll_top() - 1);
            }
            None => {
                self.window.scroll_by_with_x_and_y(0.0, 1.0);
                self.window.scroll_by_with_x_and_y(0.0, -1.0);
            }
        }
    }
}

/// Handle to one conversation row node
#[derive(Clone)]
pub struct DomRow {
    element: HtmlElement,
    document: Document,
    seen: WeakSet,
    config: Rc<ArchiverConfig>,
    handlers: Rc<Handlers>,
}

impl DomRow {
    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    /// Read everything field extraction needs out of the live node
    pub fn snapshot(&self) -> RowSnapshot {
        let element: &Element = &self.element;
        let item_id = element.get_attribute(&self.config.row_id_attribute);
        let first_text = |selector: &str| {
            element
                .query_selector(selector)
                .ok()
                .flatten()
                .and_then(|found| found.text_content())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };

        RowSnapshot {
            item_id,
            text: self.text(),
            html: element.outer_html(),
            link_text: first_text(r#"a[role="link"]"#),
            styled_text: first_text(r#"strong, span[dir="auto"]"#),
            text_nodes: self.text_nodes(),
            image_sources: self.image_sources(),
        }
    }

    fn text(&self) -> String {
        let text = self.element.inner_text();
        // Our own button is part of the node but not of the conversation
        text.replace(ARCHIVE_ICON, "").trim_end().to_string()
    }

    fn text_nodes(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_text_nodes(&self.element, &mut found);
        found
    }

    fn image_sources(&self) -> Vec<String> {
        let Ok(images) = self.element.query_selector_all("img") else {
            return Vec::new();
        };
        (0..images.length())
            .filter_map(|i| images.get(i))
            .filter_map(|node| node.dyn_into::<HtmlImageElement>().ok())
            .map(|image| image.src())
            .collect()
    }

    fn create_archive_button(&self) -> Result<HtmlElement> {
        let button: HtmlElement = self
            .document
            .create_element("button")
            .map_err(ArchiveError::bridge)?
            .unchecked_into();
        button.set_class_name(ARCHIVE_BUTTON_CLASS);
        button.set_title("Archive conversation");
        button.set_text_content(Some(ARCHIVE_ICON));

        let handlers = Rc::clone(&self.handlers);
        let row = self.clone();
        let on_click = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            event.stop_propagation();
            event.prevent_default();
            let handler = handlers.archive.borrow().clone();
            if let Some(handler) = handler {
                handler(row.clone());
            }
        });
        button
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(ArchiveError::bridge)?;
        on_click.forget();
        Ok(button)
    }
}

fn collect_text_nodes(node: &Node, found: &mut Vec<String>) {
    let children = node.child_nodes();
    for child in (0..children.length()).filter_map(|i| children.get(i)) {
        match child.node_type() {
            Node::TEXT_NODE => {
                if let Some(text) = child.text_content() {
                    let text = text.trim();
                    if !text.is_empty() {
                        found.push(text.to_string());
                    }
                }
            }
            Node::ELEMENT_NODE => {
                let is_ours = child
                    .dyn_ref::<Element>()
                    .is_some_and(|e| e.class_list().contains(ARCHIVE_BUTTON_CLASS));
                if !is_ours {
                    collect_text_nodes(&child, found);
                }
            }
            _ => {}
        }
    }
}

impl ConversationRow for DomRow {
    fn message_id(&self) -> String {
        let snapshot = RowSnapshot {
            item_id: self.element.get_attribute(&self.config.row_id_attribute),
            text: self.text(),
            ..Default::default()
        };
        snapshot.message_id(self.config.id_prefix_chars)
    }

    fn is_seen(&self) -> bool {
        self.seen.has(&self.element)
    }

    fn mark_seen(&self) {
        self.seen.add(&self.element);
    }

    fn has_archive_button(&self) -> bool {
        let selector = format!(".{}", ARCHIVE_BUTTON_CLASS);
        matches!(self.element.query_selector(&selector), Ok(Some(_)))
    }

    fn inject_archive_button(&self) {
        let result = self.create_archive_button().and_then(|button| {
            let style = self.element.style();
            style
                .set_property("position", "relative")
                .map_err(ArchiveError::bridge)?;
            self.element
                .set_attribute("data-archiver-row", "")
                .map_err(ArchiveError::bridge)?;
            self.element.append_child(&button).map_err(ArchiveError::bridge)?;
            Ok(())
        });
        if let Err(e) = result {
            log::warn!("Could not add archive button: {}", e);
        }
    }

    fn is_archived(&self) -> bool {
        self.element.has_attribute(ARCHIVED_ATTRIBUTE)
    }

    fn set_archived(&self, archived: bool) {
        let style = self.element.style();
        let result = if archived {
            self.element
                .set_attribute(ARCHIVED_ATTRIBUTE, "true")
                .and_then(|_| style.set_property("display", "none"))
        } else {
            self.element
                .remove_attribute(ARCHIVED_ATTRIBUTE)
                .and_then(|_| style.remove_property("display").map(|_| ()))
        };
        if let Err(e) = result {
            log::warn!("Could not update row visibility: {:?}", e);
        }
    }

    fn force_repaint(&self) {
        // Recycled nodes can carry a stale fade-out from the host page
        let style = self.element.style();
        if let Err(e) = style
            .set_property("visibility", "visible")
            .and_then(|_| style.set_property("opacity", "1"))
        {
            log::warn!("Could not reset row styling: {:?}", e);
        }
        // Reading layout flushes pending style changes for the node
        let _ = self.element.offset_height();
    }
}
