//! # twosub-settings
//!
//! Configuration for speech-recognition acquisition.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`AsrSettings::default()`])
//! 2. **User file** `~/.twosub/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** `TWOSUB_*` (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<AsrSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads from disk and the environment. When loading fails
/// the error is logged and compiled defaults are used.
pub fn get_settings() -> &'static AsrSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            AsrSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: AsrSettings) -> std::result::Result<(), AsrSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
