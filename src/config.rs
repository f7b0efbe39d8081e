//! Application-level configuration constants.

// Collaborator endpoints
pub const UPLOAD_ENDPOINT: &str = "/upload";
pub const IMPORT_ENDPOINT: &str = "/import";
pub const CHAT_COMPLETIONS_URL: &str = "https://ai.hackclub.com/chat/completions";

// Network bounds
pub const UPLOAD_TIMEOUT_MS: u32 = 60_000;
pub const IMPORT_TIMEOUT_MS: u32 = 30_000;

// UI Behavior
pub const TOAST_MS: u32 = 5_000;
/// How long download and print object URLs stay valid.
pub const REVOKE_DELAY_MS: u32 = 60_000;

// Min/Max limits for the tier slider
pub const MIN_TIER_COUNT: usize = 1;
pub const MAX_TIER_COUNT: usize = 10;

// Themes offered in the picker; the saved one is applied on load
pub const THEMES: &[&str] = &[
    "coffee", "light", "dark", "cupcake", "retro", "synthwave", "forest", "dracula",
];
