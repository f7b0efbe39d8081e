//! Persisted user preferences. Only the theme is stored.

use log::debug;
use std::collections::HashMap;

use crate::defaults::{DEFAULT_THEME, THEME_KEY};

/// Key/value storage that survives a page reload.
pub trait PreferenceStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
}

impl PreferenceStore for HashMap<String, String> {
    fn read(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

/// Saved theme, or the default when nothing usable is stored.
pub fn load_theme(store: &impl PreferenceStore) -> String {
    store
        .read(THEME_KEY)
        .map(|theme| theme.trim().to_string())
        .filter(|theme| !theme.is_empty())
        .unwrap_or_else(|| DEFAULT_THEME.to_string())
}

pub fn save_theme(store: &mut impl PreferenceStore, theme: &str) {
    debug!("Saving theme '{}'", theme);
    store.write(THEME_KEY, theme);
}
