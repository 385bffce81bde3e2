#![cfg(target_arch = "wasm32")]

use chrono::{TimeZone, Utc};
use dm_archiver::config::ArchiverConfig;
use dm_archiver::dom::{BrowserScheduler, DomPage, observe};
use dm_archiver::message::ArchivedMessage;
use dm_archiver::panel::view::list_entries;
use dm_archiver::panel::{ArchiveList, ArchiveListProps};
use dm_archiver::session::{SessionHandle, SortOrder};
use dm_archiver::sync::{ConversationRow, PageHost, SyncEngine};
use futures::StreamExt;
use std::collections::HashSet;
use std::rc::Rc;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn page_with_rows(rows: &[(&str, &str)]) -> Rc<DomPage> {
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    let body = document.body().unwrap();
    body.set_inner_html("");

    for (id, text) in rows {
        let row = document.create_element("div").unwrap();
        row.set_attribute("data-testid", "conversation").unwrap();
        row.set_attribute("data-item-id", id).unwrap();
        row.set_inner_html(text);
        body.append_child(&row).unwrap();
    }
    Rc::new(DomPage::new(window, ArchiverConfig::default()).unwrap())
}

#[wasm_bindgen_test]
fn snapshot_reads_row_markup() {
    let page = page_with_rows(&[(
        "conv-1",
        r#"<a role="link"><span>Jane Doe</span> <span>@janedoe</span></a><div>hey are you free</div>"#,
    )]);

    let rows = page.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].message_id(), "conv-1");

    let snapshot = rows[0].snapshot();
    assert_eq!(snapshot.item_id.as_deref(), Some("conv-1"));
    assert_eq!(snapshot.link_text.as_deref(), Some("Jane Doe @janedoe"));
    assert!(snapshot.text_nodes.contains(&"hey are you free".to_string()));
}

#[wasm_bindgen_test]
fn decorate_hides_archived_rows() {
    let page = page_with_rows(&[("a", "<span>Alice</span>"), ("b", "<span>Bob</span>")]);
    let window = web_sys::window().unwrap();
    let engine = SyncEngine::new(
        Rc::clone(&page),
        SessionHandle::new(),
        Rc::new(BrowserScheduler::new(window)),
        &ArchiverConfig::default(),
    );

    let archived: HashSet<String> = ["b".to_string()].into_iter().collect();
    assert_eq!(engine.decorate_rows(&archived), 2);

    let rows = page.rows();
    assert!(rows.iter().all(|row| row.has_archive_button() && row.is_seen()));
    assert!(!rows[0].is_archived());
    assert!(rows[1].is_archived());

    let hidden = rows[1].element();
    assert_eq!(hidden.style().get_property_value("display").unwrap(), "none");

    // The host page fades recycled rows out; a revealed row must not stay invisible
    hidden.style().set_property("opacity", "0").unwrap();
    hidden.style().set_property("visibility", "hidden").unwrap();

    assert_eq!(engine.reveal("b"), 1);
    assert_eq!(hidden.style().get_property_value("display").unwrap(), "");
    assert_eq!(hidden.style().get_property_value("visibility").unwrap(), "visible");
    assert_eq!(hidden.style().get_property_value("opacity").unwrap(), "1");
}

#[wasm_bindgen_test]
fn archive_button_text_is_not_part_of_the_id() {
    let page = page_with_rows(&[("", "<span>No attribute here</span>")]);
    let row = &page.rows()[0];
    let before = row.message_id();

    row.inject_archive_button();

    assert_eq!(row.message_id(), before);
    assert_eq!(before, "No attribute here");
}

#[wasm_bindgen_test]
async fn observe_reports_added_rows() {
    let page = page_with_rows(&[]);
    let document = page.document().clone();
    let body = document.body().unwrap();

    let predicate_page = Rc::clone(&page);
    let mut feed = observe(&body, move |element| predicate_page.holds_row(element)).unwrap();

    let unrelated = document.create_element("p").unwrap();
    body.append_child(&unrelated).unwrap();
    let row = document.create_element("div").unwrap();
    row.set_attribute("data-testid", "conversation").unwrap();
    body.append_child(&row).unwrap();

    let batch = feed.next().await.unwrap();
    assert_eq!(batch.matched, 1);
}

fn archived(id: &str, username: &str, hour: u32) -> ArchivedMessage {
    ArchivedMessage {
        id: id.to_string(),
        content: format!("{} says hi", username),
        html: String::new(),
        avatar: String::new(),
        username: username.to_string(),
        handle: String::new(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 14, hour, 0, 0).unwrap(),
        message_timestamp: None,
        message_preview: "hi".to_string(),
    }
}

#[wasm_bindgen_test]
async fn archive_list_renders_one_entry_per_record() {
    let document = web_sys::window().unwrap().document().unwrap();
    let body = document.body().unwrap();
    body.set_inner_html("");
    let host = document.create_element("div").unwrap();
    body.append_child(&host).unwrap();

    let messages = vec![archived("a", "Alice", 10), archived("b", "Bob", 12)];
    let now = Utc.with_ymd_and_hms(2024, 5, 14, 13, 0, 0).unwrap().fixed_offset();
    let props = ArchiveListProps {
        entries: list_entries(&messages, "", SortOrder::Newest, now),
        on_restore: yew::Callback::noop(),
    };
    let app = yew::Renderer::<ArchiveList>::with_root_and_props(host.clone(), props).render();
    yew::platform::time::sleep(std::time::Duration::from_millis(0)).await;

    let entries = host.query_selector_all(".archiver-entry").unwrap();
    assert_eq!(entries.length(), 2);
    let first = host.query_selector(".archiver-entry strong").unwrap().unwrap();
    assert_eq!(first.text_content().unwrap(), "Bob");
    app.destroy();
}
