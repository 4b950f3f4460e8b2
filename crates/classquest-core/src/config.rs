//! Configuration loading and typed config structures for ClassQuest.
//!
//! The canonical configuration lives in `classquest-config.yaml` at the
//! project root. Every section and field is optional; missing values take
//! the defaults defined here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use classquest_types::{
    DEFAULT_AVATAR_STAGE_THRESHOLDS, DEFAULT_CLASS_MILESTONE_STEP, DEFAULT_STREAK_THRESHOLD,
    DEFAULT_XP_PER_LEVEL,
};
use serde::Deserialize;

/// Environment variable overriding [`StorageConfig::document_path`].
pub const DOCUMENT_PATH_ENV: &str = "CLASSQUEST_DOCUMENT";

/// Environment variable overriding [`StorageConfig::blob_dir`].
pub const BLOB_DIR_ENV: &str = "CLASSQUEST_BLOB_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `classquest-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassQuestConfig {
    /// Settings applied to freshly created documents.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Where the document and blobs live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sound and animation effect tuning.
    #[serde(default)]
    pub effects: EffectsConfig,
}

impl ClassQuestConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override storage paths:
    /// - `CLASSQUEST_DOCUMENT` overrides `storage.document_path`
    /// - `CLASSQUEST_BLOB_DIR` overrides `storage.blob_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.storage.apply_env_overrides();
        Ok(config)
    }
}

/// Settings for newly created documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefaultsConfig {
    /// Display name of the class.
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// XP needed per student level.
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u32,

    /// Class XP between two stars.
    #[serde(default = "default_class_milestone_step")]
    pub class_milestone_step: u32,

    /// Display name of the class stars.
    #[serde(default = "default_class_stars_name")]
    pub class_stars_name: String,

    /// Streak length that earns a badge.
    #[serde(default = "default_streak_threshold")]
    pub streak_threshold_for_badge: u32,

    /// Levels at which avatars reach their second and third stage.
    #[serde(default = "default_avatar_stage_thresholds")]
    pub avatar_stage_thresholds: [u32; 2],

    /// Theme id (`system`, `light`, `dark`, ...).
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Whether sound effects start enabled.
    #[serde(default)]
    pub sfx_enabled: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            class_name: default_class_name(),
            xp_per_level: default_xp_per_level(),
            class_milestone_step: default_class_milestone_step(),
            class_stars_name: default_class_stars_name(),
            streak_threshold_for_badge: default_streak_threshold(),
            avatar_stage_thresholds: default_avatar_stage_thresholds(),
            theme: default_theme(),
            sfx_enabled: false,
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON document.
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,

    /// Directory holding uploaded blobs.
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            blob_dir: default_blob_dir(),
        }
    }
}

impl StorageConfig {
    /// Apply environment variable overrides to storage paths.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(DOCUMENT_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.document_path = PathBuf::from(val);
        }
        if let Some(val) = lookup(BLOB_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.blob_dir = PathBuf::from(val);
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Effect tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EffectsConfig {
    /// Window in which bursts of sound cues collapse into one.
    #[serde(default = "default_coalesce_window_ms")]
    pub coalesce_window_ms: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: default_coalesce_window_ms(),
        }
    }
}

impl EffectsConfig {
    /// The coalescing window as a [`Duration`].
    pub const fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_class_name() -> String {
    "My Class".to_owned()
}

const fn default_xp_per_level() -> u32 {
    DEFAULT_XP_PER_LEVEL
}

const fn default_class_milestone_step() -> u32 {
    DEFAULT_CLASS_MILESTONE_STEP
}

fn default_class_stars_name() -> String {
    "Stars".to_owned()
}

const fn default_streak_threshold() -> u32 {
    DEFAULT_STREAK_THRESHOLD
}

const fn default_avatar_stage_thresholds() -> [u32; 2] {
    DEFAULT_AVATAR_STAGE_THRESHOLDS
}

fn default_theme() -> String {
    "system".to_owned()
}

fn default_document_path() -> PathBuf {
    PathBuf::from("classquest-state.json")
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("classquest-blobs")
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_coalesce_window_ms() -> u64 {
    150
}
