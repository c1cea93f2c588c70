//! Rune shaping configuration
//!
//! This crate provides centralized configuration for the text shaping
//! crates, loading settings from `rune.toml` with environment variable
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Text shaping settings
    pub shaping: ShapingConfig,
}

/// Text shaping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// Path to the font file (.ttf/.otf/.ttc) used for shaping
    pub font: Option<PathBuf>,
    /// Face index within a font collection
    pub font_index: u32,
    /// Font size in pixels per em
    pub font_size: f32,
    /// Tab size, counted in space widths
    pub tab_size: f32,
    /// ISO-15924 script tag used when the caller does not pass one (e.g. "Latn")
    pub script: Option<String>,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_index: 0,
            font_size: 16.0,
            tab_size: 8.0,
            script: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(variable = name, value = %val, "ignoring unparsable override");
            None
        }
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (rune.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        match Self::load_from_file("rune.toml") {
            Ok(config) => config,
            Err(ConfigError::Read { .. }) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(font) = std::env::var("RUNE_SHAPE_FONT") {
            self.shaping.font = Some(PathBuf::from(font));
        }
        if let Some(index) = parse_env::<u32>("RUNE_SHAPE_FONT_INDEX") {
            self.shaping.font_index = index;
        }
        if let Some(size) = parse_env::<f32>("RUNE_SHAPE_FONT_SIZE") {
            self.shaping.font_size = size;
        }
        if let Some(tab_size) = parse_env::<f32>("RUNE_SHAPE_TAB_SIZE") {
            self.shaping.tab_size = tab_size;
        }
        if let Ok(script) = std::env::var("RUNE_SHAPE_SCRIPT") {
            self.shaping.script = Some(script);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
