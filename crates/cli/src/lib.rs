use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use models::{OutputMetadata, Settings};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reads a JSON document from disk.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let txt = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))
}

/// Pretty-prints `value` to `out`, creating parent directories, or to stdout when `out` is None.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(out_path) => {
            if let Some(parent) = out_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            fs::write(out_path, json).with_context(|| format!("writing {}", out_path.display()))?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Percentage of net income paid to creditors: the requested one, or the
/// settings default, checked against the allocation policy unless `allow_any`.
pub fn resolve_percentage(
    settings: &Settings,
    requested: Option<f64>,
    allow_any: bool,
) -> Result<f64> {
    let policy = &settings.allocation;
    let percentage = requested.unwrap_or(policy.default_percentage);
    if !allow_any && !policy.permits(percentage) {
        bail!(
            "allocation percentage {} is not allowed by policy {:?} \
             (use --allow-any-percentage to override)",
            percentage,
            policy.allowed_percentages
        );
    }
    Ok(percentage)
}

pub fn output_metadata(settings: &Settings) -> OutputMetadata {
    OutputMetadata {
        generated_at: Local::now().to_rfc3339(),
        settings_version: settings.settings_version,
        currency: settings.currency.clone(),
    }
}
