//! Editor configuration.
//!
//! Every recognized option lives in one record, [`EditorConfig`], resolved
//! once before the pipeline is built. Stock defaults are overridden by an
//! optional user `config.toml` passed with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [filters]
//! default_strength = 1.0    # Strength for --filter without --strength
//! max_blur_radius = 50      # Largest accepted box-blur radius
//!
//! [edge]
//! channels = "per-channel"  # "per-channel" or "luminance"
//! normalize = false         # Scale the strongest edge to 255
//!
//! [output]
//! display = "auto"          # "auto", "always" or "never"
//! # viewer = "feh"          # Program used to display results
//!
//! [processing]
//! # max_threads = 4         # Convolution workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::convolve::{EdgeChannels, EdgeOptions};
use crate::kernel;
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Every option the editor recognizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Filter defaults and limits.
    pub filters: FiltersConfig,
    /// Sobel edge-detection behavior.
    pub edge: EdgeConfig,
    /// Where results go when the pipeline finishes.
    pub output: OutputConfig,
    /// Parallel convolution settings.
    pub processing: ProcessingConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strength = self.filters.default_strength;
        if !strength.is_finite() || strength < 0.0 {
            return Err(ConfigError::Validation(
                "filters.default_strength must be a non-negative number".into(),
            ));
        }
        if self.filters.max_blur_radius == 0 {
            return Err(ConfigError::Validation(
                "filters.max_blur_radius must be at least 1".into(),
            ));
        }
        if self.filters.max_blur_radius > kernel::MAX_RADIUS {
            return Err(ConfigError::Validation(format!(
                "filters.max_blur_radius must be at most {}",
                kernel::MAX_RADIUS
            )));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        if self.output.viewer.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "output.viewer must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Pipeline settings derived from this config.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            default_strength: self.filters.default_strength,
            max_blur_radius: self.filters.max_blur_radius,
            edge: EdgeOptions {
                channels: self.edge.channels,
                normalize: self.edge.normalize,
            },
        }
    }
}

/// Filter defaults and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    /// Strength used when `--filter` is not followed by `--strength`.
    pub default_strength: f32,
    /// Largest box-blur radius accepted; `2r+1` is the kernel side.
    pub max_blur_radius: usize,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            default_strength: 1.0,
            max_blur_radius: 50,
        }
    }
}

/// Sobel edge-detection behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeConfig {
    pub channels: EdgeChannels,
    pub normalize: bool,
}

/// When to show the result on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayPolicy {
    /// Display only when no output path is given.
    #[default]
    Auto,
    /// Always display, even after saving.
    Always,
    /// Never display.
    Never,
}

impl DisplayPolicy {
    /// Whether to display, given whether the result is being saved and
    /// whether `--display` was passed.
    pub fn should_display(self, saving: bool, forced: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => forced,
            Self::Auto => forced || !saving,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub display: DisplayPolicy,
    /// Program launched with the path of a temporary PNG. When absent the
    /// platform opener is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,
}

/// Parallel convolution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of convolution worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EditorConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the editor config.
///
/// With no path the stock defaults are returned. With a path, the file must
/// exist; its values are merged over the defaults and validated.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Printed by `--print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# image-layers configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Filters
# ---------------------------------------------------------------------------
[filters]
# Strength for a --filter that is not followed by --strength.
# blur: kernel radius = max(1, round(strength))
# sharpen: center weight 1 + 4*strength, edge weights -strength
# edge: multiplier applied to the gradient magnitude
default_strength = 1.0

# Largest accepted blur radius. A radius r builds a (2r+1)x(2r+1) kernel.
max_blur_radius = 50

# ---------------------------------------------------------------------------
# Edge detection (Sobel)
# ---------------------------------------------------------------------------
[edge]
# "per-channel": gradient magnitude of each color channel on its own.
# "luminance":   gradient of the luminance plane, written to every channel.
channels = "per-channel"

# Rescale magnitudes so the strongest edge becomes 255.
normalize = false

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# "auto":   display the result only when --output is not given
# "always": display the result even when saving
# "never":  only display with --display
display = "auto"

# Program used to display results. Defaults to the platform opener
# (xdg-open, open, or start).
# viewer = "feh"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Convolution worker threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}
