//! Yew view components for the tier list UI.
//!
//! Components render from props and report user intent through callbacks.
//! Only the tier label editor and the command box keep local state.

use log::warn;
use std::rc::Rc;
use web_sys::{DragEvent, File, FileList, HtmlInputElement, KeyboardEvent};
use yew::prelude::*;

use tier_maker::{Item, Location, Notice, Tier};

use crate::config::{MAX_TIER_COUNT, MIN_TIER_COUNT};
use crate::hooks::{use_validated_input, AfterAccept};
use crate::utils::{validate_command, validate_tier_label};

/// Collect the files of an `<input type="file">` or a drop.
pub fn files_from_list(list: Option<FileList>) -> Vec<File> {
    let Some(list) = list else {
        return Vec::new();
    };
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

fn on_enter(commit: Callback<()>) -> Callback<KeyboardEvent> {
    Callback::from(move |e: KeyboardEvent| {
        if e.key() == "Enter" {
            e.prevent_default();
            commit.emit(());
        }
    })
}

/// Drag callbacks shared by every place an item card can appear.
#[derive(Clone, PartialEq)]
pub struct DragHandlers {
    pub on_drag_start: Callback<String>,
    pub on_drag_end: Callback<()>,
    pub on_remove: Callback<String>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Items

#[derive(Properties, PartialEq)]
pub struct ItemCardProps {
    pub item: Item,
    pub show_label: bool,
    pub handlers: DragHandlers,
}

#[function_component(ItemCard)]
pub fn item_card(props: &ItemCardProps) -> Html {
    let item = &props.item;

    let ondragstart = {
        let id = item.id.clone();
        let on_drag_start = props.handlers.on_drag_start.clone();
        Callback::from(move |e: DragEvent| {
            if let Some(transfer) = e.data_transfer() {
                if let Err(err) = transfer.set_data("text/plain", &id) {
                    warn!("Could not attach '{}' to the drag: {:?}", id, err);
                }
                transfer.set_effect_allowed("move");
            }
            on_drag_start.emit(id.clone());
        })
    };
    let ondragend = {
        let on_drag_end = props.handlers.on_drag_end.clone();
        Callback::from(move |_: DragEvent| on_drag_end.emit(()))
    };
    let onremove = {
        let id = item.id.clone();
        let on_remove = props.handlers.on_remove.clone();
        Callback::from(move |_: MouseEvent| on_remove.emit(id.clone()))
    };

    let media = if item.is_image() {
        html! { <img src={item.media_url.clone()} alt={item.display_name.clone()} draggable="false" /> }
    } else {
        html! {
            <div class="audio-item">
                <span class="audio-icon">{ "♪" }</span>
                <audio controls=true preload="none" src={item.media_url.clone()} />
            </div>
        }
    };

    html! {
        <div class="tier-item" draggable="true" title={item.display_name.clone()}
            {ondragstart} {ondragend}>
            { media }
            if props.show_label {
                if let Some(label) = &item.label {
                    <span class="item-label">{ label.clone() }</span>
                }
            }
            <span class="item-name">{ item.display_name.clone() }</span>
            <button class="remove-item" title="Remove" onclick={onremove}>{ "×" }</button>
        </div>
    }
}

fn render_items(items: &[Item], show_labels: bool, handlers: &DragHandlers) -> Html {
    items
        .iter()
        .map(|item| {
            html! {
                <ItemCard key={item.id.clone()} item={item.clone()}
                    show_label={show_labels} handlers={handlers.clone()} />
            }
        })
        .collect::<Html>()
}

// ──────────────────────────────────────────────────────────────────────────────
// Tier rows

#[derive(Properties, PartialEq)]
pub struct TierRowProps {
    pub index: usize,
    pub tier: Tier,
    pub show_labels: bool,
    pub handlers: DragHandlers,
    pub on_drop: Callback<Location>,
    pub on_relabel: Callback<(usize, String)>,
}

#[function_component(TierRow)]
pub fn tier_row(props: &TierRowProps) -> Html {
    let editing = use_state(|| false);
    let drag_over = use_state(|| false);

    let on_accept = {
        let index = props.index;
        let on_relabel = props.on_relabel.clone();
        let editing = editing.clone();
        Callback::from(move |label: String| {
            on_relabel.emit((index, label));
            editing.set(false);
        })
    };
    let label_input = use_validated_input(
        props.tier.label.clone(),
        Rc::new(validate_tier_label),
        on_accept,
        AfterAccept::Canonical,
    );

    let start_edit = {
        let editing = editing.clone();
        Callback::from(move |_: MouseEvent| editing.set(true))
    };
    let onkeydown = on_enter(label_input.on_commit.clone());
    let onblur = {
        let commit = label_input.on_commit.clone();
        Callback::from(move |_: FocusEvent| commit.emit(()))
    };

    let ondragover = {
        let drag_over = drag_over.clone();
        Callback::from(move |e: DragEvent| {
            e.prevent_default();
            if !*drag_over {
                drag_over.set(true);
            }
        })
    };
    let ondragleave = {
        let drag_over = drag_over.clone();
        Callback::from(move |_: DragEvent| drag_over.set(false))
    };
    let ondrop = {
        let drag_over = drag_over.clone();
        let on_drop = props.on_drop.clone();
        let index = props.index;
        Callback::from(move |e: DragEvent| {
            e.prevent_default();
            drag_over.set(false);
            on_drop.emit(Location::Tier(index));
        })
    };

    let label_cell = if *editing {
        html! {
            <div class="tier-label editing">
                <input type="text" class="tier-label-input"
                    value={label_input.text.clone()}
                    oninput={label_input.on_text_input.clone()}
                    {onkeydown} {onblur}
                    autofocus=true />
                if let Some(err) = &label_input.error {
                    <span class="error-message">{ err.clone() }</span>
                }
            </div>
        }
    } else {
        html! {
            <div class="tier-label" title="Click to rename" onclick={start_edit}>
                { props.tier.label.clone() }
            </div>
        }
    };

    html! {
        <div class={classes!("tier-row", format!("tier-{}", props.index), drag_over.then_some("drag-over"))}
            id={props.tier.id.clone()}>
            { label_cell }
            <div class="tier-content" {ondragover} {ondragleave} {ondrop}>
                { render_items(&props.tier.items, props.show_labels, &props.handlers) }
            </div>
        </div>
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Upload area

#[derive(Properties, PartialEq)]
pub struct UploadZoneProps {
    pub pool: Vec<Item>,
    pub show_labels: bool,
    pub handlers: DragHandlers,
    /// Raw drop on the zone; the caller decides whether it carries files
    /// or an item being returned.
    pub on_drop: Callback<DragEvent>,
    pub on_browse: Callback<Vec<File>>,
}

#[function_component(UploadZone)]
pub fn upload_zone(props: &UploadZoneProps) -> Html {
    let drag_over = use_state(|| false);
    let file_input = use_node_ref();

    let ondragover = {
        let drag_over = drag_over.clone();
        Callback::from(move |e: DragEvent| {
            e.prevent_default();
            if !*drag_over {
                drag_over.set(true);
            }
        })
    };
    let ondragleave = {
        let drag_over = drag_over.clone();
        Callback::from(move |_: DragEvent| drag_over.set(false))
    };
    let ondrop = {
        let drag_over = drag_over.clone();
        let on_drop = props.on_drop.clone();
        Callback::from(move |e: DragEvent| {
            e.prevent_default();
            drag_over.set(false);
            on_drop.emit(e);
        })
    };
    let open_picker = {
        let file_input = file_input.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(input) = file_input.cast::<HtmlInputElement>() {
                input.click();
            }
        })
    };
    let onchange = {
        let on_browse = props.on_browse.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let files = files_from_list(input.files());
            input.set_value("");
            if !files.is_empty() {
                on_browse.emit(files);
            }
        })
    };

    html! {
        <section class={classes!("upload-zone", drag_over.then_some("drag-over"))}
            {ondragover} {ondragleave} {ondrop}>
            <div class="upload-prompt">
                <p>{ "Drop images or audio here, or " }
                    <button class="browse-button" onclick={open_picker}>{ "browse" }</button>
                </p>
                <p class="upload-hint">{ "PNG, JPEG, GIF, MP3, WAV, OGG, M4A, AAC. Max 5MB each." }</p>
                <input type="file" multiple=true hidden=true
                    accept="image/*,audio/*" ref={file_input} {onchange} />
            </div>
            <div class="uploaded-items">
                { render_items(&props.pool, props.show_labels, &props.handlers) }
            </div>
        </section>
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Controls

/// Slider for the number of tiers.
#[derive(Properties, PartialEq)]
pub struct TierCountSliderProps {
    pub tier_count: usize,
    pub oninput: Callback<InputEvent>,
}

#[function_component(TierCountSlider)]
pub fn tier_count_slider(props: &TierCountSliderProps) -> Html {
    html! {
        <div class="form-group">
            <label for="tier_count">{ "Tiers:" }</label>
            <div class="slider-with-value">
                <input type="range" id="tier_count"
                    min={MIN_TIER_COUNT.to_string()}
                    max={MAX_TIER_COUNT.to_string()}
                    value={props.tier_count.to_string()}
                    oninput={props.oninput.clone()}
                />
                <span class="slider-value">{ props.tier_count }</span>
            </div>
        </div>
    }
}

/// Text entry for move commands, with the voice toggle beside it.
#[derive(Properties, PartialEq)]
pub struct CommandBoxProps {
    pub busy: bool,
    pub voice_supported: bool,
    pub listening: bool,
    pub on_command: Callback<String>,
    pub on_toggle_voice: Callback<()>,
}

#[function_component(CommandBox)]
pub fn command_box(props: &CommandBoxProps) -> Html {
    let command_input = use_validated_input(
        String::new(),
        Rc::new(validate_command),
        props.on_command.clone(),
        AfterAccept::Clear,
    );
    let onkeydown = on_enter(command_input.on_commit.clone());
    let onsubmit = {
        let commit = command_input.on_commit.clone();
        Callback::from(move |_: MouseEvent| commit.emit(()))
    };
    let ontogglevoice = {
        let toggle = props.on_toggle_voice.clone();
        Callback::from(move |_: MouseEvent| toggle.emit(()))
    };

    html! {
        <div class="command-box">
            if props.voice_supported {
                <button class={classes!("voice-button", props.listening.then_some("listening"))}
                    title="Voice commands" onclick={ontogglevoice}>
                    { if props.listening { "Stop listening" } else { "Voice" } }
                </button>
            }
            <input type="text" class="command-input"
                placeholder="e.g. move cat to S tier"
                value={command_input.text.clone()}
                oninput={command_input.on_text_input.clone()}
                {onkeydown}
                disabled={props.busy} />
            <button class="command-submit" onclick={onsubmit} disabled={props.busy}>
                { if props.busy { "Working..." } else { "Go" } }
            </button>
            if let Some(err) = &command_input.error {
                <span class="error-message">{ err.clone() }</span>
            }
        </div>
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Notifications

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub notice: Notice,
    pub on_close: Callback<()>,
}

#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    let onclick = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };
    html! {
        <div class={classes!("toast", format!("toast-{}", props.notice.level.as_str()))} role="status">
            <span class="toast-message">{ props.notice.message.clone() }</span>
            <button class="toast-close" {onclick}>{ "×" }</button>
        </div>
    }
}
