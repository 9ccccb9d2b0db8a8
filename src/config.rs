//! Site configuration module.
//!
//! Loads and validates the `config.toml` that sits at the content root. The
//! file is optional and sparse: stock defaults are serialized to a TOML
//! table, the user's file is merged on top, and the result is deserialized
//! with unknown keys rejected.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml      # Site config (never listed as content)
//! ├── index.md
//! └── notes/
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "sekiei"
//! base_url = ""
//! description = ""
//!
//! [images]
//! compress_to_webp = false  # Point image references at .webp variants
//! lazy_placeholders = true  # Blurred placeholders for lazy-loaded images
//! quality = 90              # JPEG/PNG re-encode quality (0-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [comments]
//! repo = "owner/repo"       # Free-form keys, passed to templates untouched
//! ```
//!
//! Unknown keys are rejected to catch typos early, except inside
//! `[comments]`, whose keys belong to the comment widget.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the site config inside the content root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity used by templates.
    pub site: SiteMeta,
    /// Image reference rewriting and variant generation.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Opaque comment-widget identifiers, passed through to every view.
    pub comments: BTreeMap<String, String>,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 0-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if !self.site.base_url.is_empty()
            && !(self.site.base_url.starts_with("http://")
                || self.site.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "site.base_url must be an http(s) URL, got {:?}",
                self.site.base_url
            )));
        }
        Ok(())
    }
}

/// Site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    /// Absolute site URL, empty when the site is served from `/`.
    pub base_url: String,
    pub description: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "sekiei".to_string(),
            base_url: String::new(),
            description: String::new(),
        }
    }
}

/// Image handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Rewrite `.jpg`/`.jpeg`/`.png` references to `.webp` and generate the
    /// lossless WebP variants.
    pub compress_to_webp: bool,
    /// Emit a blurred placeholder for every lazy-loaded image.
    pub lazy_placeholders: bool,
    /// Re-encode quality for JPEG and PNG sources when not converting to WebP.
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            compress_to_webp: false,
            lazy_placeholders: true,
            quality: 90,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for rendering and encoding.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config for a content root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# Site Configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site identity
# ---------------------------------------------------------------------------
[site]
title = "sekiei"

# Absolute URL the site is published under. Leave empty to serve from "/".
base_url = ""

description = ""

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Point .jpg/.jpeg/.png references at lossless .webp variants.
compress_to_webp = false

# Generate a tiny blurred placeholder shown until a lazy image loads.
lazy_placeholders = true

# JPEG/PNG re-encode quality when not converting to WebP (0-100).
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for rendering and image encoding.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Comments
# ---------------------------------------------------------------------------
[comments]
# Free-form string keys handed to the comment widget as-is.
# repo = "owner/repo"
"##
}
