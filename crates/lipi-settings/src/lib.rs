//! # lipi-settings
//!
//! Layered configuration for the lipi handwriting recognizer.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`LipiSettings::default()`]
//! 2. **User file** — `~/.lipi/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `LIPI_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = LipiSettings::default();
        assert!(settings_path().ends_with(".lipi/settings.json"));
    }

    #[test]
    fn deep_merge_re_exported() {
        let merged = deep_merge(serde_json::json!({"x": 1}), serde_json::json!({"y": 2}));
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
