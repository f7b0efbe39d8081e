//! Tier list core: the board, its placement rules, command resolution,
//! recognition labels and the save/import format.
//!
//! Nothing in this crate touches the DOM. The Yew front end in `main.rs`
//! turns browser events into [`session::SessionAction`]s and renders the
//! resulting [`board::Board`].

pub mod annotator;
pub mod board;
pub mod collaborator;
pub mod media;
pub mod persistence;
pub mod preferences;
pub mod print;
pub mod resolver;
pub mod session;

pub use board::{Board, BoardError, Location, Tier};
pub use media::{Item, MediaKind};
pub use session::{CommandGate, Notice, NoticeLevel, Session, SessionAction};

/// Default board and collaborator parameters
pub mod defaults {
    pub const DEFAULT_TIER_COUNT: usize = 5;
    pub const DEFAULT_TIER_LABELS: &[&str] = &["S", "A", "B", "C", "D", "F", "G", "H"];

    // Upload boundary
    pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
    pub const ALLOWED_MIME_TYPES: &[&str] = &[
        "image/png",
        "image/jpeg",
        "image/jpg",
        "image/gif",
        "audio/mpeg",
        "audio/mp3",
        "audio/wav",
        "audio/ogg",
        "audio/mp4",
        "audio/aac",
    ];

    // Command parsing
    pub const COMMAND_TIMEOUT_MS: u32 = 10_000;
    pub const COMMAND_MAX_TOKENS: u32 = 1000;
    pub const MAX_PARSE_ATTEMPTS: u32 = 2;
    pub const RETRY_DELAY_MS: u32 = 1000;

    // Recognition
    pub const RECOGNITION_TIMEOUT_MS: u32 = 15_000;
    pub const RECOGNITION_MAX_TOKENS: u32 = 100;
    pub const RECOGNITION_MODEL: &str = "gpt-4-vision-preview";
    /// Longest edge of the image sent for recognition.
    pub const RECOGNITION_IMAGE_EDGE: u32 = 512;

    // Preferences
    pub const THEME_KEY: &str = "theme";
    pub const DEFAULT_THEME: &str = "coffee";
}
