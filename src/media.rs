//! Uploaded media items and the upload boundary.
//!
//! An [`Item`] is created from the upload endpoint's reply (or rebuilt from
//! the import endpoint's list of available files). Files are validated here
//! before anything is sent over the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::defaults::{ALLOWED_MIME_TYPES, MAX_UPLOAD_BYTES};

/// What kind of media an item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn from_is_audio(is_audio: bool) -> Self {
        if is_audio {
            MediaKind::Audio
        } else {
            MediaKind::Image
        }
    }

    pub fn is_audio(self) -> bool {
        self == MediaKind::Audio
    }
}

/// One uploaded media asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Storage filename assigned by the server. Unique across the board.
    pub id: String,
    /// Filename as the user uploaded it.
    pub display_name: String,
    pub media_url: String,
    pub kind: MediaKind,
    /// One-word recognition tag, if the item has been annotated.
    pub label: Option<String>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        media_url: impl Into<String>,
        kind: MediaKind,
    ) -> Self {
        Item {
            id: id.into(),
            display_name: display_name.into(),
            media_url: media_url.into(),
            kind,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// Name used in user-facing messages: `"label" (name)` when labelled.
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!("\"{}\" ({})", label, self.display_name),
            None => format!("\"{}\"", self.display_name),
        }
    }
}

/// A file record as the upload and import endpoints report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_audio: bool,
}

impl From<UploadedFile> for Item {
    fn from(file: UploadedFile) -> Self {
        let display_name = if file.original_name.is_empty() {
            file.filename.clone()
        } else {
            file.original_name
        };
        Item::new(
            file.filename,
            display_name,
            file.url,
            MediaKind::from_is_audio(file.is_audio),
        )
    }
}

/// Reply body of the upload endpoint: either the accepted files or an error.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Turn the reply into items, surfacing the server's error message.
    pub fn into_items(self) -> Result<Vec<Item>, UploadError> {
        if let Some(error) = self.error {
            return Err(UploadError::Rejected(error));
        }
        Ok(self.files.into_iter().map(Item::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    UnsupportedType { name: String, mime: String },
    TooLarge { name: String, size: u64 },
    NothingToUpload,
    /// The upload endpoint answered with an error payload or failed outright.
    Rejected(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::UnsupportedType { name, .. } => write!(f, "Invalid file type: {}", name),
            UploadError::TooLarge { name, .. } => write!(
                f,
                "File too large: {} (max {}MB)",
                name,
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ),
            UploadError::NothingToUpload => write!(f, "No valid files selected"),
            UploadError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// Check a candidate file against the allowed MIME types and size ceiling.
pub fn validate_file(name: &str, mime: &str, size: u64) -> Result<(), UploadError> {
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(UploadError::UnsupportedType {
            name: name.to_string(),
            mime: mime.to_string(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            name: name.to_string(),
            size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_listed_types_within_ceiling() {
        assert!(validate_file("cat.png", "image/png", 1024).is_ok());
        assert!(validate_file("song.mp3", "audio/mpeg", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn rejects_unknown_type() {
        let err = validate_file("notes.pdf", "application/pdf", 10).unwrap_err();
        assert_eq!(err.to_string(), "Invalid file type: notes.pdf");
    }

    #[test]
    fn rejects_oversized_file() {
        let err = validate_file("huge.gif", "image/gif", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
        assert_eq!(err.to_string(), "File too large: huge.gif (max 5MB)");
    }

    #[test]
    fn upload_reply_without_is_audio_defaults_to_image() {
        let reply: UploadResponse = serde_json::from_str(
            r#"{"files":[{"filename":"cat_1a2b3c4d.png","original_name":"cat.png","url":"/uploads/cat_1a2b3c4d.png"}]}"#,
        )
        .unwrap();
        let items = reply.into_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "cat_1a2b3c4d.png");
        assert_eq!(items[0].display_name, "cat.png");
        assert_eq!(items[0].kind, MediaKind::Image);
        assert!(items[0].label.is_none());
    }

    #[test]
    fn upload_reply_error_is_surfaced() {
        let reply: UploadResponse =
            serde_json::from_str(r#"{"error":"Invalid file type: a.bmp"}"#).unwrap();
        assert_eq!(
            reply.into_items(),
            Err(UploadError::Rejected("Invalid file type: a.bmp".into()))
        );
    }

    #[test]
    fn describe_prefers_label() {
        let item = Item::new("a_1.png", "a.png", "/u/a_1.png", MediaKind::Image);
        assert_eq!(item.describe(), "\"a.png\"");
        assert_eq!(item.with_label("cat").describe(), "\"cat\" (a.png)");
    }
}
