//! Main module for the Tier Maker application using Yew.
//! Wires UI components, the session reducer, and side-effect logic.

use chrono::Utc;
use gloo_timers::callback::Timeout;
use log::{debug, error, info, warn};
use std::rc::Rc;
use web_sys::{DragEvent, File, HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use tier_maker::{
    annotator::annotate, media::validate_file, persistence, preferences, print, resolver::resolve,
    Board, CommandGate, Item, Location, Notice, Session, SessionAction,
};

mod browser;
mod components;
mod config;
mod hooks;
mod net;
mod utils;
mod voice;

use components::{
    files_from_list, CommandBox, DragHandlers, TierCountSlider, TierRow, Toast, UploadZone,
};
use config::*;
use net::FetchChatClient;
use utils::{theme_title, validate_tier_count};
use voice::VoiceSession;

// ──────────────────────────────────────────────────────────────────────────────
// App state

/// The visible notice. `id` distinguishes successive notices so an
/// auto-dismiss timer only clears the one it was started for.
#[derive(Clone, PartialEq)]
struct ShownNotice {
    id: u64,
    notice: Notice,
}

#[derive(Clone, PartialEq, Default)]
struct AppState {
    session: Session,
    notice: Option<ShownNotice>,
    notices_shown: u64,
}

enum AppAction {
    Session(SessionAction),
    Notify(Notice),
    Dismiss(u64),
}

impl Reducible for AppState {
    type Action = AppAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        let notice = match action {
            AppAction::Session(action) => next.session.apply(action),
            AppAction::Notify(notice) => Some(notice),
            AppAction::Dismiss(id) => {
                if next.notice.as_ref().is_some_and(|shown| shown.id == id) {
                    next.notice = None;
                }
                None
            }
        };
        if let Some(notice) = notice {
            next.notices_shown += 1;
            next.notice = Some(ShownNotice {
                id: next.notices_shown,
                notice,
            });
        }
        Rc::new(next)
    }
}

type Dispatcher = UseReducerDispatcher<AppState>;

// ──────────────────────────────────────────────────────────────────────────────
// Helper functions

/// Label each image in turn. Results arrive one by one as actions.
async fn annotate_items(items: Vec<Item>, dispatcher: Dispatcher) {
    let client = FetchChatClient::recognition();
    for item in items {
        let data_url = match net::image_to_data_url(&item.media_url).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Could not prepare '{}' for recognition: {}", item.display_name, e);
                None
            }
        };
        let annotation = annotate(&client, &item.display_name, data_url.as_deref()).await;
        debug!("'{}' labelled via {:?}", item.display_name, annotation.source);
        dispatcher.dispatch(AppAction::Session(SessionAction::Annotated {
            item_id: item.id,
            label: annotation.label,
        }));
    }
}

/// Validate, upload, add to the pool and start recognition for images.
fn start_upload(files: Vec<File>, recognition_enabled: bool, dispatcher: Dispatcher) {
    let mut accepted = Vec::with_capacity(files.len());
    for file in files {
        match validate_file(&file.name(), &file.type_(), file.size() as u64) {
            Ok(()) => accepted.push(file),
            Err(e) => dispatcher.dispatch(AppAction::Notify(Notice::error(e.to_string()))),
        }
    }
    if accepted.is_empty() {
        return;
    }

    info!("Uploading {} file(s)", accepted.len());
    dispatcher.dispatch(AppAction::Notify(Notice::info(format!(
        "Uploading {} file(s)...",
        accepted.len()
    ))));
    wasm_bindgen_futures::spawn_local(async move {
        match net::upload_files(&accepted).await {
            Ok(items) => {
                let images: Vec<Item> =
                    items.iter().filter(|item| item.is_image()).cloned().collect();
                dispatcher.dispatch(AppAction::Session(SessionAction::Uploaded(items)));
                if recognition_enabled && !images.is_empty() {
                    annotate_items(images, dispatcher).await;
                }
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                dispatcher.dispatch(AppAction::Notify(Notice::error(e.to_string())));
            }
        }
    });
}

// ──────────────────────────────────────────────────────────────────────────────
// Main application component

#[function_component(App)]
fn app() -> Html {
    let state = use_reducer(AppState::default);
    let theme = use_state(|| preferences::load_theme(&browser::LocalStore::open()));
    let gate = use_state(CommandGate::default);
    let command_busy = use_state(|| false);
    let listening = use_state(|| false);
    let voice_session = use_mut_ref(|| None::<VoiceSession>);
    // Id of the item being dragged, if the drag started on one of our cards
    let dragged = use_mut_ref(|| None::<String>);
    // Commands resolve against the board as it is when they are issued,
    // which a long-lived voice closure cannot read from `state`.
    let latest_board = use_mut_ref(Board::default);
    *latest_board.borrow_mut() = state.session.board().clone();

    let board = state.session.board();
    let recognition_enabled = state.session.recognition_enabled();

    // Apply and remember the theme
    use_effect_with((*theme).clone(), |theme| {
        browser::apply_theme(theme);
        preferences::save_theme(&mut browser::LocalStore::open(), theme);
        || ()
    });

    // Auto-dismiss the current notice
    {
        let dispatcher = state.dispatcher();
        let notice_id = state.notice.as_ref().map(|shown| shown.id);
        use_effect_with(notice_id, move |notice_id| {
            let timeout = notice_id.map(|id| {
                Timeout::new(TOAST_MS, move || dispatcher.dispatch(AppAction::Dismiss(id)))
            });
            move || drop(timeout)
        });
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Drag and drop

    let handlers = {
        let dispatcher = state.dispatcher();
        let on_drag_start = {
            let dragged = dragged.clone();
            Callback::from(move |id: String| *dragged.borrow_mut() = Some(id))
        };
        let on_drag_end = {
            let dragged = dragged.clone();
            Callback::from(move |_: ()| *dragged.borrow_mut() = None)
        };
        let on_remove = Callback::from(move |id: String| {
            dispatcher.dispatch(AppAction::Session(SessionAction::Remove(id)))
        });
        DragHandlers {
            on_drag_start,
            on_drag_end,
            on_remove,
        }
    };

    let on_tier_drop = {
        let dispatcher = state.dispatcher();
        let dragged = dragged.clone();
        Callback::from(move |destination: Location| {
            if let Some(item_id) = dragged.borrow_mut().take() {
                dispatcher.dispatch(AppAction::Session(SessionAction::Place {
                    item_id,
                    destination,
                }));
            }
        })
    };

    let on_relabel = {
        let dispatcher = state.dispatcher();
        Callback::from(move |(tier_index, label): (usize, String)| {
            dispatcher.dispatch(AppAction::Session(SessionAction::Relabel { tier_index, label }))
        })
    };

    let on_upload_zone_drop = {
        let dispatcher = state.dispatcher();
        let dragged = dragged.clone();
        Callback::from(move |e: DragEvent| {
            if let Some(item_id) = dragged.borrow_mut().take() {
                dispatcher.dispatch(AppAction::Session(SessionAction::Place {
                    item_id,
                    destination: Location::Pool,
                }));
                return;
            }
            let files = files_from_list(e.data_transfer().and_then(|t| t.files()));
            if files.is_empty() {
                dispatcher.dispatch(AppAction::Notify(Notice::error(
                    "Please select files to upload",
                )));
            } else {
                start_upload(files, recognition_enabled, dispatcher.clone());
            }
        })
    };

    let on_browse = {
        let dispatcher = state.dispatcher();
        Callback::from(move |files: Vec<File>| {
            start_upload(files, recognition_enabled, dispatcher.clone())
        })
    };

    // ──────────────────────────────────────────────────────────────────────────
    // Board controls

    let on_tier_count_input = {
        let dispatcher = state.dispatcher();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            match validate_tier_count(&input.value()) {
                Ok(count) => {
                    dispatcher.dispatch(AppAction::Session(SessionAction::ResizeTiers(count)))
                }
                Err(e) => warn!("Ignoring tier count: {}", e),
            }
        })
    };

    let on_toggle_recognition = {
        let dispatcher = state.dispatcher();
        let pending = board.unlabeled_images();
        Callback::from(move |_: MouseEvent| {
            let enabling = !recognition_enabled;
            dispatcher.dispatch(AppAction::Session(SessionAction::SetRecognition(enabling)));
            if enabling && !pending.is_empty() {
                dispatcher.dispatch(AppAction::Notify(Notice::info(format!(
                    "Analyzing {} existing image(s)...",
                    pending.len()
                ))));
                wasm_bindgen_futures::spawn_local(annotate_items(
                    pending.clone(),
                    dispatcher.clone(),
                ));
            }
        })
    };

    // ──────────────────────────────────────────────────────────────────────────
    // Save, import, print

    let on_save = {
        let dispatcher = state.dispatcher();
        let board = board.clone();
        Callback::from(move |_: MouseEvent| {
            let now = Utc::now();
            let document = persistence::serialize(&board, now);
            let saved = persistence::to_json(&document)
                .map_err(|e| e.to_string())
                .and_then(|json| {
                    browser::download_text(
                        &persistence::export_file_name(now),
                        &json,
                        "application/json",
                    )
                    .map_err(|e| format!("{:?}", e))
                });
            match saved {
                Ok(()) => dispatcher.dispatch(AppAction::Notify(Notice::success(
                    "Tier list saved successfully!",
                ))),
                Err(e) => {
                    error!("Save failed: {}", e);
                    dispatcher.dispatch(AppAction::Notify(Notice::error(
                        "Failed to save tier list",
                    )));
                }
            }
        })
    };

    let import_input = use_node_ref();
    let on_import_click = {
        let import_input = import_input.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(input) = import_input.cast::<HtmlInputElement>() {
                input.click();
            }
        })
    };
    let on_import_change = {
        let dispatcher = state.dispatcher();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let file = files_from_list(input.files()).into_iter().next();
            input.set_value("");
            let Some(file) = file else {
                return;
            };
            let dispatcher = dispatcher.clone();
            dispatcher.dispatch(AppAction::Notify(Notice::info("Importing tier list...")));
            wasm_bindgen_futures::spawn_local(async move {
                match net::import_tier_list(&file).await {
                    Ok(reply) => {
                        let (board, report) = persistence::import(reply);
                        dispatcher.dispatch(AppAction::Session(SessionAction::Imported {
                            board,
                            report,
                        }));
                    }
                    Err(e) => {
                        error!("Import failed: {}", e);
                        dispatcher.dispatch(AppAction::Notify(Notice::error(e.to_string())));
                    }
                }
            });
        })
    };

    let on_print = {
        let dispatcher = state.dispatcher();
        let board = board.clone();
        Callback::from(move |_: MouseEvent| {
            let generated_at = Utc::now().format("%Y-%m-%d %H:%M").to_string();
            let html = print::printable_html(&board, &generated_at, &browser::page_origin());
            match browser::open_print_window(&html) {
                Ok(()) => {
                    dispatcher.dispatch(AppAction::Notify(Notice::info("Opening print dialog...")))
                }
                Err(e) => {
                    warn!("Print window failed: {:?}", e);
                    let message = e
                        .as_string()
                        .unwrap_or_else(|| "Could not open print window".to_string());
                    dispatcher.dispatch(AppAction::Notify(Notice::error(message)));
                }
            }
        })
    };

    let on_theme_change = {
        let theme = theme.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            theme.set(select.value());
        })
    };

    // ──────────────────────────────────────────────────────────────────────────
    // Commands

    let run_command = {
        let dispatcher = state.dispatcher();
        let gate = (*gate).clone();
        let command_busy = command_busy.clone();
        let latest_board = latest_board.clone();
        Callback::from(move |transcript: String| {
            let Some(permit) = gate.try_acquire() else {
                dispatcher.dispatch(AppAction::Notify(Notice::info(
                    "Still working on the last command...",
                )));
                return;
            };
            info!("Command: {}", transcript);
            let board = latest_board.borrow().clone();
            let dispatcher = dispatcher.clone();
            let command_busy = command_busy.clone();
            command_busy.set(true);
            dispatcher.dispatch(AppAction::Notify(Notice::info(format!(
                "Processing: \"{}\"",
                transcript
            ))));
            wasm_bindgen_futures::spawn_local(async move {
                let client = FetchChatClient::commands();
                match resolve(&client, &board, &transcript).await {
                    Ok(resolution) => dispatcher.dispatch(AppAction::Session(
                        SessionAction::ApplyResolution(resolution),
                    )),
                    Err(e) => {
                        dispatcher.dispatch(AppAction::Notify(Notice::warning(e.to_string())))
                    }
                }
                drop(permit);
                command_busy.set(false);
            });
        })
    };

    let on_toggle_voice = {
        let dispatcher = state.dispatcher();
        let listening = listening.clone();
        let voice_session = voice_session.clone();
        let run_command = run_command.clone();
        Callback::from(move |_: ()| {
            if voice_session.borrow_mut().take().is_some() {
                listening.set(false);
                dispatcher.dispatch(AppAction::Notify(Notice::info("Voice recognition stopped")));
                return;
            }
            let run_command = run_command.clone();
            let on_error = {
                let dispatcher = dispatcher.clone();
                move |reason: String| {
                    warn!("Voice recognition error: {}", reason);
                    dispatcher.dispatch(AppAction::Notify(Notice::warning(format!(
                        "Voice recognition error: {}",
                        reason
                    ))));
                }
            };
            match VoiceSession::start(move |transcript| run_command.emit(transcript), on_error) {
                Some(session) => {
                    *voice_session.borrow_mut() = Some(session);
                    listening.set(true);
                    dispatcher.dispatch(AppAction::Notify(Notice::success(
                        "Voice recognition started. Say e.g. \"move cat to S tier\"",
                    )));
                }
                None => dispatcher.dispatch(AppAction::Notify(Notice::error(
                    "Voice recognition is not available. Use the command box instead.",
                ))),
            }
        })
    };

    let on_dismiss = {
        let dispatcher = state.dispatcher();
        let notice_id = state.notice.as_ref().map(|shown| shown.id);
        Callback::from(move |_: ()| {
            if let Some(id) = notice_id {
                dispatcher.dispatch(AppAction::Dismiss(id));
            }
        })
    };

    // ──────────────────────────────────────────────────────────────────────────
    // Render

    html! {
        <div class="container">
            <header class="app-header">
                <h1>{ "Tier Maker" }</h1>
                <div class="header-controls">
                    <select class="theme-select" onchange={on_theme_change}>
                        { THEMES.iter().map(|name| html! {
                            <option value={*name} selected={*name == theme.as_str()}>{ theme_title(name) }</option>
                        }).collect::<Html>() }
                    </select>
                    <button class={classes!("recognition-toggle", recognition_enabled.then_some("active"))}
                        onclick={on_toggle_recognition}>
                        { if recognition_enabled { "Recognition: On" } else { "Recognition: Off" } }
                    </button>
                    <button onclick={on_save}>{ "Save" }</button>
                    <button onclick={on_import_click}>{ "Import" }</button>
                    <input type="file" accept=".json,application/json" hidden=true
                        ref={import_input} onchange={on_import_change} />
                    <button onclick={on_print}>{ "Print" }</button>
                </div>
            </header>

            <TierCountSlider tier_count={board.tier_count()} oninput={on_tier_count_input} />

            <section class="tier-list">
                { board.tiers().iter().enumerate().map(|(index, tier)| html! {
                    <TierRow key={tier.id.clone()} {index} tier={tier.clone()}
                        show_labels={recognition_enabled}
                        handlers={handlers.clone()}
                        on_drop={on_tier_drop.clone()}
                        on_relabel={on_relabel.clone()} />
                }).collect::<Html>() }
            </section>

            <UploadZone pool={board.pool().to_vec()}
                show_labels={recognition_enabled}
                handlers={handlers.clone()}
                on_drop={on_upload_zone_drop}
                {on_browse} />

            <CommandBox busy={*command_busy}
                voice_supported={voice::is_voice_supported()}
                listening={*listening}
                on_command={run_command}
                {on_toggle_voice} />

            if let Some(shown) = &state.notice {
                <Toast notice={shown.notice.clone()} on_close={on_dismiss} />
            }
        </div>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
