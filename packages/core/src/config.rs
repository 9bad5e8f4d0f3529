//! Configuration for a deck session
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding [`DeckConfig::save_debounce_ms`]
pub const ENV_SAVE_DEBOUNCE_MS: &str = "DECKNOTE_SAVE_DEBOUNCE_MS";
/// Environment variable overriding [`DeckConfig::max_import_bytes`]
pub const ENV_MAX_IMPORT_BYTES: &str = "DECKNOTE_MAX_IMPORT_BYTES";
/// Environment variable overriding [`DeckConfig::max_import_blocks`]
pub const ENV_MAX_IMPORT_BLOCKS: &str = "DECKNOTE_MAX_IMPORT_BLOCKS";
/// Environment variable setting [`DeckConfig::data_dir`]
pub const ENV_DATA_DIR: &str = "DECKNOTE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Quiet period after the last edit before a note is saved
    pub save_debounce_ms: u64,

    /// Largest markdown document accepted by import, in bytes
    pub max_import_bytes: usize,

    /// Largest number of top-level blocks an imported note may have
    pub max_import_blocks: usize,

    /// Root directory for JSON deck files
    pub data_dir: Option<PathBuf>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1000,
            max_import_bytes: 1_000_000,
            max_import_blocks: 5_000,
            data_dir: None,
        }
    }
}

impl DeckConfig {
    /// Defaults overlaid with `DECKNOTE_*` environment variables.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_var(&lookup, ENV_SAVE_DEBOUNCE_MS) {
            config.save_debounce_ms = ms;
        }
        if let Some(bytes) = parse_var(&lookup, ENV_MAX_IMPORT_BYTES) {
            config.max_import_bytes = bytes;
        }
        if let Some(blocks) = parse_var(&lookup, ENV_MAX_IMPORT_BLOCKS) {
            config.max_import_blocks = blocks;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        config
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.save_debounce_ms == 0 {
            return Err("save_debounce_ms must be greater than 0".to_string());
        }

        if self.max_import_bytes == 0 {
            return Err("max_import_bytes must be greater than 0".to_string());
        }

        if self.max_import_blocks == 0 {
            return Err("max_import_blocks must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}
