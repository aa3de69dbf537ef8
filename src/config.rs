//! Configuration file support.
//!
//! Editor settings are JSON, loaded from the user config directory on native
//! builds and from localStorage in the browser.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PART_ENDPOINT, MAX_SCALE, MIN_SCALE, SLIDER_STEP, UNDO_HISTORY_LIMIT,
    VISIBILITY_EXPIRY_DAYS,
};
use crate::model::PartEndpoint;

/// Log verbosity, stored lowercase (`"warn"`, `"debug"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Level handed to `console_log` in the browser.
    pub fn to_level(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }

    /// Filter handed to `env_logger` on native builds.
    pub fn to_level_filter(self) -> log::LevelFilter {
        self.to_level().to_level_filter()
    }
}

/// Format version written to new files; newer files are refused.
pub const CONFIG_VERSION: u32 = 1;

/// File name under the config directory.
pub const CONFIG_FILENAME: &str = "pagesync-config.json";

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Lower zoom bound
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    /// Upper zoom bound
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    /// Zoom range input step
    #[serde(default = "default_slider_step")]
    pub slider_step: f32,

    /// Maximum undo entries kept per page
    #[serde(default = "default_undo_history_limit")]
    pub undo_history_limit: usize,

    /// Lifetime of persisted "open" panel flags
    #[serde(default = "default_visibility_expiry_days")]
    pub visibility_expiry_days: u64,

    /// Part endpoint template with `{document}` and `{part}` placeholders
    #[serde(default = "default_part_endpoint")]
    pub part_endpoint: String,

    /// Document whose parts are edited
    #[serde(default)]
    pub document_id: u64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_min_scale() -> f32 {
    MIN_SCALE
}

fn default_max_scale() -> f32 {
    MAX_SCALE
}

fn default_slider_step() -> f32 {
    SLIDER_STEP
}

fn default_undo_history_limit() -> usize {
    UNDO_HISTORY_LIMIT
}

fn default_visibility_expiry_days() -> u64 {
    VISIBILITY_EXPIRY_DAYS
}

fn default_part_endpoint() -> String {
    DEFAULT_PART_ENDPOINT.to_string()
}

impl EditorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            slider_step: default_slider_step(),
            undo_history_limit: default_undo_history_limit(),
            visibility_expiry_days: default_visibility_expiry_days(),
            part_endpoint: default_part_endpoint(),
            document_id: 0,
            log_level: LogLevel::default(),
        }
    }

    /// Configuration for a given document.
    pub fn for_document(document_id: u64) -> Self {
        Self {
            document_id,
            ..Self::new()
        }
    }

    /// Replace unusable values with defaults.
    pub fn validated(mut self) -> Self {
        let bounds_ok = self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale;
        if !bounds_ok {
            log::warn!(
                "Invalid scale bounds [{}, {}], using defaults",
                self.min_scale,
                self.max_scale
            );
            self.min_scale = default_min_scale();
            self.max_scale = default_max_scale();
        }
        if !(self.slider_step.is_finite() && self.slider_step > 0.0) {
            self.slider_step = default_slider_step();
        }
        if self.undo_history_limit == 0 {
            self.undo_history_limit = default_undo_history_limit();
        }
        self
    }

    /// Endpoint for this configuration's document.
    pub fn endpoint(&self) -> PartEndpoint {
        PartEndpoint::new(self.part_endpoint.clone(), self.document_id)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config.validated())
    }

    /// `<config dir>/pagesync/pagesync-config.json`, next to the panel store.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pagesync").join(CONFIG_FILENAME))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::debug!("Editor config read from {:?}", path);
        Ok(config)
    }

    /// Write the configuration, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::debug!("Editor config written to {:?}", path);
        Ok(())
    }

    /// Read `path`, or write the defaults there when no file exists yet so
    /// the user has a file to edit.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_init(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load_from_path(path);
        }
        let config = Self::new();
        config.save_to_path(path)?;
        Ok(config)
    }

    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "pagesync-config";

    /// Settings saved in localStorage, if any parse.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a configuration could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Editor config version {file_version} is newer than {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Editor config I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_defaults() {
        let config = EditorConfig::for_document(9);
        let json = config.to_json().unwrap();
        let parsed = EditorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EditorConfig::from_json(r#"{"version": 1, "document_id": 4}"#).unwrap();
        assert_eq!(config.min_scale, MIN_SCALE);
        assert_eq!(config.max_scale, MAX_SCALE);
        assert_eq!(config.visibility_expiry_days, 30);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(
            config.endpoint().url(crate::model::PageId(2)),
            "/api/documents/4/parts/2/"
        );
    }

    #[test]
    fn test_version_too_new() {
        let err = EditorConfig::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_inverted_bounds_replaced() {
        let config =
            EditorConfig::from_json(r#"{"version": 1, "min_scale": 5.0, "max_scale": 2.0}"#)
                .unwrap();
        assert_eq!(config.min_scale, MIN_SCALE);
        assert_eq!(config.max_scale, MAX_SCALE);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_load_or_init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagesync").join(CONFIG_FILENAME);

        let first = EditorConfig::load_or_init(&path).unwrap();
        assert_eq!(first, EditorConfig::new());
        assert!(path.is_file());

        let mut edited = EditorConfig::for_document(12);
        edited.log_level = LogLevel::Warn;
        edited.save_to_path(&path).unwrap();

        let second = EditorConfig::load_or_init(&path).unwrap();
        assert_eq!(second, edited);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_load_or_init_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "{ version: ").unwrap();

        let err = EditorConfig::load_or_init(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ version: ");
    }

    #[test]
    fn test_log_level_names() {
        let config = EditorConfig::from_json(r#"{"version": 1, "log_level": "debug"}"#).unwrap();
        assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    }
}
