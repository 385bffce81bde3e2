/// Floating archive panel injected into the host page

use crate::bridge::{ChromeStorage, StorageSubscription};
use crate::message::{ArchivedMessage, PanelPosition};
use crate::panel::view::{DRAG_END_EVENTS, DragState, ListEntry, empty_message, list_entries, placement_style};
use crate::session::{SessionHandle, SortOrder};
use crate::storage::{ARCHIVE_KEY, ArchiveStore};
use crate::ui::components::{Avatar, HighlightedText};
use chrono::Local;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlInputElement};
use yew::prelude::*;

pub const PANEL_ID: &str = "archivePanel";
const CLEAR_CONFIRMATION: &str = "Are you sure you want to clear all archived messages?";

#[derive(Clone, PartialEq)]
enum PanelState {
    Loading,
    Idle,
    Error(String),
}

#[derive(Properties, PartialEq)]
pub struct ArchivePanelProps {
    pub session: SessionHandle,
    pub on_restore: Callback<String>,
    pub on_clear: Callback<()>,
    pub on_close: Callback<()>,
    /// Fired on every drag movement; the last write wins
    pub on_move: Callback<PanelPosition>,
}

#[function_component(ArchivePanel)]
pub fn archive_panel(props: &ArchivePanelProps) -> Html {
    let state = use_state(|| PanelState::Loading);
    let messages = use_state(Vec::<ArchivedMessage>::new);
    let query = use_state(|| props.session.search_query());
    let sort_order = use_state(|| props.session.sort_order());
    let position = use_state(|| props.session.panel_position());
    let drag = use_mut_ref(DragState::default);
    let panel_ref = use_node_ref();

    // Load on mount and again after every archive write, whoever made it
    {
        let state = state.clone();
        let messages = messages.clone();

        use_effect_with((), move |_| {
            let reload = move || {
                let state = state.clone();
                let messages = messages.clone();
                spawn_local(async move {
                    match ArchiveStore::new(ChromeStorage).load().await {
                        Ok(loaded) => {
                            messages.set(loaded);
                            state.set(PanelState::Idle);
                        }
                        Err(e) => {
                            log::warn!("Failed to load archive for panel: {}", e);
                            state.set(PanelState::Error(e.to_string()));
                        }
                    }
                });
            };
            reload();

            let subscription = StorageSubscription::subscribe(move |change| {
                if change.touches(ARCHIVE_KEY) {
                    reload();
                }
            });
            move || drop(subscription)
        });
    }

    // Dragging tracks the pointer anywhere on the page, not just over the header
    {
        let drag = drag.clone();
        let position = position.clone();
        let session = props.session.clone();
        let on_move = props.on_move.clone();

        use_effect_with((), move |_| {
            let on_mouse_move = {
                let drag = drag.clone();
                Closure::<dyn FnMut(MouseEvent)>::new(move |e: MouseEvent| {
                    let pointer = (f64::from(e.client_x()), f64::from(e.client_y()));
                    let Some(next) = drag.borrow().drag_to(pointer) else {
                        return;
                    };
                    position.set(Some(next));
                    session.set_panel_position(Some(next));
                    on_move.emit(next);
                })
            };

            let on_drag_end = Closure::<dyn FnMut(MouseEvent)>::new(move |_: MouseEvent| {
                drag.borrow_mut().end();
            });

            let document = web_sys::window().and_then(|w| w.document());
            if let Some(document) = &document {
                let listen = |event: &str, callback: &Closure<dyn FnMut(MouseEvent)>| {
                    if let Err(e) =
                        document.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
                    {
                        log::warn!("Could not listen for {}: {:?}", event, e);
                    }
                };
                listen("mousemove", &on_mouse_move);
                for event in DRAG_END_EVENTS {
                    listen(event, &on_drag_end);
                }
            }

            move || {
                if let Some(document) = &document {
                    let _ = document.remove_event_listener_with_callback(
                        "mousemove",
                        on_mouse_move.as_ref().unchecked_ref(),
                    );
                    for event in DRAG_END_EVENTS {
                        let _ = document
                            .remove_event_listener_with_callback(event, on_drag_end.as_ref().unchecked_ref());
                    }
                }
            }
        });
    }

    let on_drag_start = {
        let drag = drag.clone();
        let panel_ref = panel_ref.clone();

        Callback::from(move |e: MouseEvent| {
            // Header buttons keep their clicks
            let on_button = e
                .target_dyn_into::<Element>()
                .and_then(|target| target.closest("button").ok().flatten())
                .is_some();
            if on_button {
                return;
            }
            let Some(panel) = panel_ref.cast::<Element>() else {
                return;
            };
            let rect = panel.get_bounding_client_rect();
            drag.borrow_mut().begin(
                (f64::from(e.client_x()), f64::from(e.client_y())),
                (rect.left(), rect.top()),
            );
            e.prevent_default();
        })
    };

    let on_search_input = {
        let query = query.clone();
        let session = props.session.clone();

        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                session.set_search_query(&input.value());
                query.set(input.value());
            }
        })
    };

    let on_clear_search = {
        let query = query.clone();
        let session = props.session.clone();

        Callback::from(move |_: MouseEvent| {
            session.set_search_query("");
            query.set(String::new());
        })
    };

    let on_sort = |order: SortOrder| {
        let sort_order = sort_order.clone();
        let session = props.session.clone();

        Callback::from(move |_: MouseEvent| {
            if session.set_sort_order(order) {
                sort_order.set(order);
            }
        })
    };

    let on_clear_all = {
        let on_clear = props.on_clear.clone();

        Callback::from(move |_: MouseEvent| {
            let confirmed = web_sys::window()
                .and_then(|w| w.confirm_with_message(CLEAR_CONFIRMATION).ok())
                .unwrap_or(false);
            if confirmed {
                on_clear.emit(());
            }
        })
    };

    let on_refresh = Callback::from(|_: MouseEvent| {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().reload() {
                log::warn!("Reload failed: {:?}", e);
            }
        }
    });

    let on_close = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };

    let normalized = props.session.search_query();
    let entries = list_entries(&messages, &normalized, *sort_order, Local::now().fixed_offset());
    let sort_class = |order: SortOrder| {
        if *sort_order == order {
            "sort-btn active"
        } else {
            "sort-btn"
        }
    };

    html! {
        <div id={PANEL_ID} ref={panel_ref} style={placement_style(*position)}>
            <div id="archiveHeader" onmousedown={on_drag_start}>
                <h3>{"Archived Messages"}</h3>
                <div style="display: flex; gap: 8px;">
                    <button class="refresh-btn" title="Reload page" onclick={on_refresh}>{"↻"}</button>
                    <button class="close-btn" title="Close" onclick={on_close}>{"✕"}</button>
                </div>
            </div>

            <div class="archiver-controls">
                <div class="archiver-search">
                    <input
                        type="text"
                        placeholder="Search archived messages"
                        value={(*query).clone()}
                        oninput={on_search_input}
                    />
                    if !query.is_empty() {
                        <button title="Clear search" onclick={on_clear_search}>{"×"}</button>
                    }
                </div>
            </div>

            <div class="archiver-controls">
                <button class={sort_class(SortOrder::Newest)} onclick={on_sort(SortOrder::Newest)}>{"Newest"}</button>
                <button class={sort_class(SortOrder::Oldest)} onclick={on_sort(SortOrder::Oldest)}>{"Oldest"}</button>
                <button class="clear-btn" onclick={on_clear_all}>{"Clear All"}</button>
            </div>

            <div class="archiver-list">
                {match &*state {
                    PanelState::Loading => html! {
                        <div class="archiver-empty">{"Loading..."}</div>
                    },
                    PanelState::Error(err) => html! {
                        <div class="archiver-empty">{format!("Could not load archive: {}", err)}</div>
                    },
                    PanelState::Idle if entries.is_empty() => html! {
                        <div class="archiver-empty">{empty_message(&normalized)}</div>
                    },
                    PanelState::Idle => html! {
                        <ArchiveList {entries} on_restore={props.on_restore.clone()} />
                    },
                }}
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ArchiveListProps {
    pub entries: Vec<ListEntry>,
    pub on_restore: Callback<String>,
}

/// Rows keyed by conversation id, so a restore only drops its own row
#[function_component(ArchiveList)]
pub fn archive_list(props: &ArchiveListProps) -> Html {
    html! {
        {for props.entries.iter().cloned().map(|entry| {
            let key = entry.id.clone();
            html! {
                <ArchiveEntry {key} {entry} on_restore={props.on_restore.clone()} />
            }
        })}
    }
}

#[derive(Properties, PartialEq)]
struct ArchiveEntryProps {
    entry: ListEntry,
    on_restore: Callback<String>,
}

#[function_component(ArchiveEntry)]
fn archive_entry(props: &ArchiveEntryProps) -> Html {
    let entry = &props.entry;
    let on_click = {
        let id = entry.id.clone();
        let on_restore = props.on_restore.clone();
        Callback::from(move |e: MouseEvent| {
            e.stop_propagation();
            on_restore.emit(id.clone());
        })
    };
    let username: String = entry.username.iter().map(|s| s.text.as_str()).collect();

    html! {
        <div class="archiver-entry">
            <Avatar src={entry.avatar.clone()} username={username} />
            <div class="body">
                <div class="meta">
                    <strong><HighlightedText segments={entry.username.clone()} /></strong>
                    if !entry.handle.is_empty() {
                        {" "}
                        <HighlightedText segments={entry.handle.clone()} />
                    }
                    {" · "}
                    {&entry.relative_time}
                </div>
                <div class="preview">
                    <HighlightedText segments={entry.preview.clone()} />
                </div>
            </div>
            <button class="restore-btn" onclick={on_click}>{"Restore"}</button>
        </div>
    }
}
