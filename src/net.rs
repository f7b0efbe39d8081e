//! Browser implementations of the network collaborators: the chat
//! completion service, the upload endpoint and the import endpoint.

use futures::future::{select, Either};
use gloo_timers::future::TimeoutFuture;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AbortController, CanvasRenderingContext2d, File, FormData, Headers, HtmlCanvasElement,
    HtmlImageElement, Request, RequestInit, Response,
};

use tier_maker::collaborator::{ChatClient, ChatRequest, ChatResponse, CollaboratorError};
use tier_maker::defaults::{COMMAND_TIMEOUT_MS, RECOGNITION_IMAGE_EDGE, RECOGNITION_TIMEOUT_MS};
use tier_maker::media::{UploadError, UploadResponse};
use tier_maker::persistence::{self, ImportResponse, PersistenceError};
use tier_maker::Item;

use crate::config::{CHAT_COMPLETIONS_URL, IMPORT_ENDPOINT, IMPORT_TIMEOUT_MS, UPLOAD_ENDPOINT, UPLOAD_TIMEOUT_MS};
use crate::utils::fit_within;

/// Best-effort text for a thrown JS value.
fn describe_js(value: JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    js_sys::JSON::stringify(&value)
        .ok()
        .map(String::from)
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Issue `request`, aborting it once `timeout_ms` passes.
async fn fetch_with_timeout(
    request: &Request,
    controller: &AbortController,
    timeout_ms: u32,
) -> Result<Response, CollaboratorError> {
    let fetch = Box::pin(JsFuture::from(gloo_utils::window().fetch_with_request(request)));
    let timeout = Box::pin(TimeoutFuture::new(timeout_ms));
    match select(fetch, timeout).await {
        Either::Left((Ok(value), _)) => value
            .dyn_into::<Response>()
            .map_err(|_| CollaboratorError::MalformedReply("fetch did not yield a Response".into())),
        Either::Left((Err(e), _)) => Err(CollaboratorError::Transport(describe_js(e))),
        Either::Right(((), _)) => {
            controller.abort();
            warn!("Request to {} timed out after {}ms", request.url(), timeout_ms);
            Err(CollaboratorError::Timeout(timeout_ms))
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: &Response) -> Result<T, String> {
    let promise = response.json().map_err(describe_js)?;
    let value = JsFuture::from(promise).await.map_err(describe_js)?;
    serde_wasm_bindgen::from_value(value).map_err(|e| e.to_string())
}

/// POST `body` to `url` with a timeout.
async fn post(
    url: &str,
    body: &JsValue,
    headers: Option<&Headers>,
    timeout_ms: u32,
) -> Result<Response, CollaboratorError> {
    let transport = |e: JsValue| CollaboratorError::Transport(describe_js(e));
    let controller = AbortController::new().map_err(transport)?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(body);
    init.set_signal(Some(&controller.signal()));
    if let Some(headers) = headers {
        init.set_headers(headers);
    }
    let request = Request::new_with_str_and_init(url, &init).map_err(transport)?;
    fetch_with_timeout(&request, &controller, timeout_ms).await
}

// ──────────────────────────────────────────────────────────────────────────
// Chat completions

/// [`ChatClient`] over `fetch`. Each call is bounded by its own timeout.
#[derive(Clone)]
pub struct FetchChatClient {
    endpoint: String,
    timeout_ms: u32,
}

impl FetchChatClient {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u32) -> Self {
        FetchChatClient {
            endpoint: endpoint.into(),
            timeout_ms,
        }
    }

    /// Client tuned for command parsing.
    pub fn commands() -> Self {
        FetchChatClient::new(CHAT_COMPLETIONS_URL, COMMAND_TIMEOUT_MS)
    }

    /// Client tuned for image recognition.
    pub fn recognition() -> Self {
        FetchChatClient::new(CHAT_COMPLETIONS_URL, RECOGNITION_TIMEOUT_MS)
    }
}

impl ChatClient for FetchChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CollaboratorError> {
        let body = serde_json::to_string(request)
            .map_err(|e| CollaboratorError::MalformedReply(e.to_string()))?;
        let headers = Headers::new().map_err(|e| CollaboratorError::Transport(describe_js(e)))?;
        headers
            .set("Content-Type", "application/json")
            .map_err(|e| CollaboratorError::Transport(describe_js(e)))?;

        let response = post(
            &self.endpoint,
            &JsValue::from_str(&body),
            Some(&headers),
            self.timeout_ms,
        )
        .await?;
        if !response.ok() {
            return Err(CollaboratorError::Status(response.status()));
        }
        let reply: ChatResponse = read_json(&response)
            .await
            .map_err(CollaboratorError::MalformedReply)?;
        reply.first_reply()
    }

    async fn pause(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Upload and import

/// Send already-validated files to the upload endpoint.
pub async fn upload_files(files: &[File]) -> Result<Vec<Item>, UploadError> {
    if files.is_empty() {
        return Err(UploadError::NothingToUpload);
    }
    let rejected = |e: JsValue| UploadError::Rejected(describe_js(e));
    let form = FormData::new().map_err(rejected)?;
    for file in files {
        form.append_with_blob_and_filename("files", file, &file.name())
            .map_err(rejected)?;
    }

    let response = post(UPLOAD_ENDPOINT, &form, None, UPLOAD_TIMEOUT_MS)
        .await
        .map_err(|e| UploadError::Rejected(e.to_string()))?;
    let status = response.status();
    let reply: UploadResponse = read_json(&response).await.map_err(|e| {
        warn!("Unreadable upload reply (status {}): {}", status, e);
        UploadError::Rejected("Upload failed. Please try again.".to_string())
    })?;
    debug!("Upload endpoint answered {} with {} file(s)", status, reply.files.len());
    reply.into_items()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportReply {
    Imported(ImportResponse),
    Failed { error: String },
}

/// Check the chosen file locally, then ask the import endpoint which of
/// its references are still available.
pub async fn import_tier_list(file: &File) -> Result<ImportResponse, PersistenceError> {
    let text = JsFuture::from(file.text())
        .await
        .map_err(|e| PersistenceError::Malformed(describe_js(e)))?
        .as_string()
        .ok_or_else(|| PersistenceError::Malformed("file is not text".to_string()))?;
    let document = persistence::parse_document(&text)?;
    debug!("Import file lists {} tier(s)", document.tiers.len());

    let rejected = |e: JsValue| PersistenceError::Rejected(describe_js(e));
    let form = FormData::new().map_err(rejected)?;
    form.append_with_blob_and_filename("file", file, &file.name())
        .map_err(rejected)?;
    let response = post(IMPORT_ENDPOINT, &form, None, IMPORT_TIMEOUT_MS)
        .await
        .map_err(|e| PersistenceError::Rejected(e.to_string()))?;

    match read_json::<ImportReply>(&response).await {
        Ok(ImportReply::Imported(reply)) => Ok(reply),
        Ok(ImportReply::Failed { error }) => Err(PersistenceError::Rejected(error)),
        Err(e) => {
            warn!("Unreadable import reply (status {}): {}", response.status(), e);
            Err(PersistenceError::Rejected(
                "Failed to import tier list".to_string(),
            ))
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Recognition input

/// Load the image at `url`, scale it to at most [`RECOGNITION_IMAGE_EDGE`]
/// on its longer side and return it as a JPEG data URL.
pub async fn image_to_data_url(url: &str) -> Result<String, CollaboratorError> {
    let transport = |e: JsValue| CollaboratorError::Transport(describe_js(e));
    let image = HtmlImageElement::new().map_err(transport)?;
    image.set_cross_origin(Some("anonymous"));
    image.set_src(url);
    JsFuture::from(image.decode()).await.map_err(transport)?;

    let (width, height) = fit_within(
        image.natural_width(),
        image.natural_height(),
        RECOGNITION_IMAGE_EDGE,
    );
    let canvas: HtmlCanvasElement = gloo_utils::document()
        .create_element("canvas")
        .map_err(transport)?
        .dyn_into()
        .map_err(|_| CollaboratorError::Transport("not a canvas".into()))?;
    canvas.set_width(width);
    canvas.set_height(height);

    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(transport)?
        .ok_or_else(|| CollaboratorError::Transport("2d context unavailable".into()))?
        .dyn_into()
        .map_err(|_| CollaboratorError::Transport("not a 2d context".into()))?;
    context
        .draw_image_with_html_image_element_and_dw_and_dh(
            &image,
            0.0,
            0.0,
            width as f64,
            height as f64,
        )
        .map_err(transport)?;
    canvas
        .to_data_url_with_type_and_encoder_options("image/jpeg", &JsValue::from_f64(0.8))
        .map_err(transport)
}
