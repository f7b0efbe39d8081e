use std::rc::Rc;
use web_sys::HtmlInputElement;
use yew::prelude::*;

/// What happens to the field text once a value is accepted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AfterAccept {
    /// Show the accepted value in its canonical form.
    Canonical,
    /// Empty the field, ready for the next entry.
    Clear,
}

/// Holds the state and callbacks for a validated text field.
#[derive(Clone)]
pub struct ValidatedInput {
    /// The current text content of the input field.
    pub text: String,
    /// An optional error message if the last commit failed validation.
    pub error: Option<String>,
    /// Callback for the input's `oninput` event.
    pub on_text_input: Callback<InputEvent>,
    /// Parse the current text and, if valid, hand the value to `on_accept`.
    /// Wire it to Enter or blur.
    pub on_commit: Callback<()>,
}

/// Parse `text` and work out what the field shows afterwards.
///
/// Returns the accepted value with the field's new text, or the
/// validation message (the text is then left as typed).
pub fn commit_text<T: std::fmt::Display>(
    text: &str,
    parse_and_validate: &dyn Fn(&str) -> Result<T, String>,
    after_accept: AfterAccept,
) -> Result<(T, String), String> {
    let parsed_val = parse_and_validate(text)?;
    let shown = match after_accept {
        AfterAccept::Canonical => parsed_val.to_string(),
        AfterAccept::Clear => String::new(),
    };
    Ok((parsed_val, shown))
}

/// Custom hook for a text field whose value is only delivered once it
/// parses and validates.
#[hook]
pub fn use_validated_input<T: std::fmt::Display + 'static>(
    initial_text: String,
    parse_and_validate: Rc<dyn Fn(&str) -> Result<T, String>>,
    on_accept: Callback<T>,
    after_accept: AfterAccept,
) -> ValidatedInput {
    let text_state_handle: UseStateHandle<String> = use_state(|| initial_text.clone());
    let error_state_handle: UseStateHandle<Option<String>> = use_state(|| None::<String>);

    let on_text_input = {
        let text_setter = text_state_handle.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            text_setter.set(input.value());
        })
    };

    let on_commit = {
        let current_text_handle = text_state_handle.clone();
        let error_setter = error_state_handle.clone();
        let parse_fn = parse_and_validate.clone();

        Callback::from(move |_| {
            match commit_text(&current_text_handle, &*parse_fn, after_accept) {
                Ok((parsed_val, shown)) => {
                    current_text_handle.set(shown);
                    error_setter.set(None);
                    on_accept.emit(parsed_val);
                }
                Err(err_msg) => error_setter.set(Some(err_msg)),
            }
        })
    };

    // Follow the initial text when it changes from outside (rename, import)
    {
        let text_setter_for_effect = text_state_handle.clone();
        let error_setter_for_effect = error_state_handle.clone();
        use_effect_with(initial_text, move |current_initial| {
            if *text_setter_for_effect != *current_initial {
                text_setter_for_effect.set(current_initial.clone());
                error_setter_for_effect.set(None);
            }
            || ()
        });
    }

    ValidatedInput {
        text: (*text_state_handle).clone(),
        error: (*error_state_handle).clone(),
        on_text_input,
        on_commit,
    }
}
