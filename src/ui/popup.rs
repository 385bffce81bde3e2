/// Popup UI for the archiver extension

use yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use patternfly_yew::prelude::*;
use crate::bridge::{send_request, ChromeStorage, StorageSubscription};
use crate::error::Result;
use crate::message::{ArchivedMessage, ACCEPTED_REQUEST};
use crate::messaging::{Request, Response};
use crate::storage::{ArchiveStore, ARCHIVE_KEY};

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading archive...".to_string()));
    let archived = use_state(Vec::<ArchivedMessage>::new);

    // Fetch through the background worker on mount, and again on every archive write
    {
        let state = state.clone();
        let archived = archived.clone();

        use_effect_with((), move |_| {
            let refresh = move || {
                let state = state.clone();
                let archived = archived.clone();
                spawn_local(async move {
                    match fetch_archived().await {
                        Ok(records) => {
                            archived.set(records);
                            state.set(AppState::Idle);
                        }
                        Err(e) => {
                            log::warn!("Failed to fetch archive: {}", e);
                            state.set(AppState::Error(format!("Failed to load: {}", e)));
                        }
                    }
                });
            };
            refresh();

            let subscription = StorageSubscription::subscribe(move |change| {
                if change.touches(ARCHIVE_KEY) {
                    refresh();
                }
            });
            move || drop(subscription)
        });
    }

    // Restore handler; the content script picks the change up and shows the row
    let on_restore = {
        let state = state.clone();

        Callback::from(move |id: String| {
            let state = state.clone();

            spawn_local(async move {
                match ArchiveStore::new(ChromeStorage).remove(&id).await {
                    Ok(Some(_)) => log::info!("Restored {:?} from popup", id),
                    Ok(None) => log::debug!("{:?} was already restored", id),
                    Err(e) => state.set(AppState::Error(format!("Restore failed: {}", e))),
                }
            });
        })
    };

    // Clear handler
    let on_clear = {
        let state = state.clone();
        let archived = archived.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let archived = archived.clone();

            state.set(AppState::Loading("Clearing archive...".to_string()));

            spawn_local(async move {
                match send_request(Request::ClearArchive).await {
                    Ok(_) => {
                        archived.set(Vec::new());
                        state.set(AppState::Idle);
                    }
                    Err(e) => {
                        state.set(AppState::Error(format!("Clear failed: {}", e)));
                    }
                }
            });
        })
    };

    let is_busy = matches!(*state, AppState::Loading(_));

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"DM Archiver"}</h1>

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            if archived.is_empty() && !is_busy {
                <p class="empty-state">{"No archived messages"}</p>
            } else {
                <ul class="archive-list">
                    {for archived.iter().map(|message| {
                        let on_restore = on_restore.clone();
                        let id = message.id.clone();
                        let preview = if message.message_preview.is_empty() {
                            ACCEPTED_REQUEST
                        } else {
                            message.message_preview.as_str()
                        };

                        html! {
                            <li key={message.id.clone()} class="archive-item">
                                <div class="archive-item-text">
                                    <strong>{&message.username}</strong>
                                    if !message.handle.is_empty() {
                                        <span class="archive-item-handle">{format!(" {}", message.handle)}</span>
                                    }
                                    <p class="archive-item-preview">{preview}</p>
                                </div>
                                <Button
                                    onclick={Callback::from(move |_| on_restore.emit(id.clone()))}
                                    disabled={is_busy}
                                    variant={ButtonVariant::Secondary}
                                >
                                    {"Restore"}
                                </Button>
                            </li>
                        }
                    })}
                </ul>
            }

            <div class="flex-column-gap">
                <Button onclick={on_clear} disabled={is_busy || archived.is_empty()} variant={ButtonVariant::Danger} block={true}>
                    {"Clear Archive"}
                </Button>
            </div>
        </div>
    }
}

async fn fetch_archived() -> Result<Vec<ArchivedMessage>> {
    match send_request(Request::GetArchived).await? {
        Response::Archived { archived } => Ok(archived),
        // A bare acknowledgement means the worker had nothing to report
        Response::Cleared { .. } => Ok(Vec::new()),
    }
}
