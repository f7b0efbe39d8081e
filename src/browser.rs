//! DOM side effects that do not belong to any component: local storage,
//! the theme attribute, file downloads and the print window.

use gloo_timers::callback::Timeout;
use log::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Storage, Url};

use tier_maker::preferences::PreferenceStore;

use crate::config::REVOKE_DELAY_MS;

/// `localStorage`, when the browser grants it.
pub struct LocalStore(Option<Storage>);

impl LocalStore {
    pub fn open() -> Self {
        LocalStore(gloo_utils::window().local_storage().ok().flatten())
    }
}

impl PreferenceStore for LocalStore {
    fn read(&self, key: &str) -> Option<String> {
        self.0.as_ref()?.get_item(key).ok().flatten()
    }

    fn write(&mut self, key: &str, value: &str) {
        match &self.0 {
            Some(storage) => {
                if let Err(e) = storage.set_item(key, value) {
                    warn!("Could not persist '{}': {:?}", key, e);
                }
            }
            None => warn!("localStorage unavailable, '{}' not persisted", key),
        }
    }
}

pub fn apply_theme(theme: &str) {
    if let Some(root) = gloo_utils::document().document_element() {
        if let Err(e) = root.set_attribute("data-theme", theme) {
            warn!("Could not apply theme '{}': {:?}", theme, e);
        }
    }
}

/// Origin of the running page, e.g. `https://host:8080`.
pub fn page_origin() -> String {
    gloo_utils::window().location().origin().unwrap_or_else(|e| {
        warn!("Could not read page origin: {:?}", e);
        String::new()
    })
}

fn blob_url(contents: &str, mime: &str) -> Result<String, JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

/// Offer `contents` as a file download named `file_name`.
pub fn download_text(file_name: &str, contents: &str, mime: &str) -> Result<(), JsValue> {
    let url = blob_url(contents, mime)?;
    let anchor: HtmlAnchorElement = gloo_utils::document()
        .create_element("a")?
        .dyn_into()
        .map_err(JsValue::from)?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();
    // The download must have started before the URL is revoked
    Timeout::new(REVOKE_DELAY_MS, move || {
        let _ = Url::revoke_object_url(&url);
    })
    .forget();
    Ok(())
}

/// Open `html` in a new window. The page prints itself once loaded.
pub fn open_print_window(html: &str) -> Result<(), JsValue> {
    let url = blob_url(html, "text/html")?;
    if gloo_utils::window()
        .open_with_url_and_target(&url, "_blank")?
        .is_none()
    {
        Url::revoke_object_url(&url)?;
        return Err(JsValue::from_str("Pop-up blocked. Please allow pop-ups to print."));
    }
    // The new window needs the URL until it has loaded
    Timeout::new(REVOKE_DELAY_MS, move || {
        let _ = Url::revoke_object_url(&url);
    })
    .forget();
    Ok(())
}
