//! # Settings Loader
//!
//! Centralized loading of `settings.json` for the repayment tools. The file
//! carries the firm's allocation policy (which shares of the client's net
//! income may go to creditors) and the display currency.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! // Explicit path first, then ./settings.json, then built-in defaults
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_or_default(path.as_ref());
//!
//! // A path given on the command line must load
//! let settings = settings_loader::resolve_settings(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use models::Settings;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Loads and validates settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    validate_settings(&settings)
        .with_context(|| format!("Validating settings in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Tries the provided path, then `settings.json` in the current directory.
/// Returns None only if no usable settings file is found anywhere.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Option<Settings> {
    if let Some(settings_path) = path {
        match load_settings(settings_path) {
            Ok(settings) => return Some(settings),
            Err(e) => tracing::warn!("Ignoring settings at {}: {:#}", settings_path.display(), e),
        }
    }

    if !settings_file_exists(DEFAULT_SETTINGS_FILE) {
        return None;
    }
    match load_settings(DEFAULT_SETTINGS_FILE) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring {}: {:#}", DEFAULT_SETTINGS_FILE, e);
            None
        }
    }
}

/// Same lookup as [`load_settings_with_fallback`], ending at the built-in defaults
pub fn load_settings_or_default(path: Option<&PathBuf>) -> Settings {
    load_settings_with_fallback(path).unwrap_or_else(|| {
        tracing::debug!("No settings file found, using defaults");
        Settings::default()
    })
}

/// An explicit path must load; without one, falls back like [`load_settings_or_default`]
pub fn resolve_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(settings_path) => load_settings(settings_path)
            .with_context(|| format!("Loading --settings {}", settings_path.display())),
        None => Ok(load_settings_or_default(None)),
    }
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

fn validate_settings(settings: &Settings) -> Result<()> {
    let policy = &settings.allocation;
    if policy.allowed_percentages.is_empty() {
        bail!("allocation.allowed_percentages must list at least one percentage");
    }
    for p in &policy.allowed_percentages {
        if !(*p > 0.0 && *p <= 100.0) {
            bail!("allocation percentage {} is outside (0, 100]", p);
        }
    }
    if !policy.permits(policy.default_percentage) {
        bail!(
            "allocation.default_percentage {} is not one of the allowed percentages {:?}",
            policy.default_percentage,
            policy.allowed_percentages
        );
    }
    Ok(())
}
