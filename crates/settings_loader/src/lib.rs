//! # Settings Loader
//!
//! Loads the converter settings from a JSON file. The settings describe the
//! header names of the original bank statement, which sheet to read, and how
//! the Odoo output is named.
//!
//! Every field is optional in the file; anything left out keeps its default
//! (the standard `Operation DT` / `Detailed description` / `Reference` /
//! `Debit` / `Credit` layout).
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/intesa.json")?;
//!
//! // Explicit path if given, else settings.json if present, else defaults
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_with_fallback(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::ConverterSettings;
use tracing::debug;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ConverterSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: ConverterSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    debug!(path = %path.display(), "loaded converter settings");
    Ok(settings)
}

/// Loads settings from the default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<ConverterSettings> {
    load_settings(DEFAULT_SETTINGS_FILE)
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<ConverterSettings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// An explicit path must load. Without one, settings.json in the current
/// directory is used when it exists, otherwise the built-in defaults.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<ConverterSettings> {
    if let Some(settings) = load_optional_settings(path)? {
        return Ok(settings);
    }

    if default_settings_exist() {
        return load_default_settings();
    }

    debug!("no settings file found, using defaults");
    Ok(ConverterSettings::default())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

/// Checks if the default settings file (settings.json) exists
pub fn default_settings_exist() -> bool {
    settings_file_exists(DEFAULT_SETTINGS_FILE)
}
