// ChatSift - platform/config.rs
//
// Platform-specific directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for ChatSift configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/chatsift/).
    pub config_dir: PathBuf,

    /// Data directory holding the default settings store.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();
            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );
            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
                data_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of the filter settings store.
    pub fn default_settings_file(&self) -> PathBuf {
        self.data_dir.join(constants::SETTINGS_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[chat]` section.
    pub chat: ChatSection,
    /// `[tail]` section.
    pub tail: TailSection,
    /// `[settings]` section.
    pub settings: SettingsSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[chat]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Entries kept in the chat log before the oldest are evicted.
    pub capacity: Option<usize>,
}

/// `[tail]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TailSection {
    /// Chat file poll interval in ms.
    pub poll_interval_ms: Option<u64>,
}

/// `[settings]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    /// Path of the filter settings store.
    pub file: Option<String>,
    /// Settings file poll interval in ms.
    pub poll_interval_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub chat_capacity: usize,
    pub tail_poll_interval_ms: u64,
    /// Settings store override. `None` = platform default.
    pub settings_file: Option<PathBuf>,
    pub settings_poll_interval_ms: u64,
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_capacity: constants::DEFAULT_CHAT_CAPACITY,
            tail_poll_interval_ms: constants::TAIL_POLL_INTERVAL_MS,
            settings_file: None,
            settings_poll_interval_ms: constants::SETTINGS_POLL_INTERVAL_MS,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns the validated config and a list of non-fatal warnings. A missing
/// file yields defaults with no warnings (first run); an unreadable or
/// unparseable file yields defaults with one warning.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.clone(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.clone(),
                source: e,
            };
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    tracing::debug!(path = %config_path.display(), "Loaded config.toml");
    let (config, validation) = validate(raw);
    warnings.extend(validation);
    (config, warnings)
}

/// Validate every field against its named bounds, accumulating all problems.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();
    let mut out_of_range = |field: &str, value: String, expected: String, default: String| {
        let err = ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value,
            expected,
        };
        warnings.push(format!("{err}. Using default ({default})."));
    };

    if let Some(capacity) = raw.chat.capacity {
        if (constants::MIN_CHAT_CAPACITY..=constants::MAX_CHAT_CAPACITY).contains(&capacity) {
            config.chat_capacity = capacity;
        } else {
            out_of_range(
                "[chat] capacity",
                capacity.to_string(),
                format!(
                    "{}-{}",
                    constants::MIN_CHAT_CAPACITY,
                    constants::MAX_CHAT_CAPACITY
                ),
                constants::DEFAULT_CHAT_CAPACITY.to_string(),
            );
        }
    }

    if let Some(ms) = raw.tail.poll_interval_ms {
        if (constants::MIN_TAIL_POLL_INTERVAL_MS..=constants::MAX_TAIL_POLL_INTERVAL_MS)
            .contains(&ms)
        {
            config.tail_poll_interval_ms = ms;
        } else {
            out_of_range(
                "[tail] poll_interval_ms",
                ms.to_string(),
                format!(
                    "{}-{}",
                    constants::MIN_TAIL_POLL_INTERVAL_MS,
                    constants::MAX_TAIL_POLL_INTERVAL_MS
                ),
                constants::TAIL_POLL_INTERVAL_MS.to_string(),
            );
        }
    }

    if let Some(ms) = raw.settings.poll_interval_ms {
        if (constants::MIN_SETTINGS_POLL_INTERVAL_MS..=constants::MAX_SETTINGS_POLL_INTERVAL_MS)
            .contains(&ms)
        {
            config.settings_poll_interval_ms = ms;
        } else {
            out_of_range(
                "[settings] poll_interval_ms",
                ms.to_string(),
                format!(
                    "{}-{}",
                    constants::MIN_SETTINGS_POLL_INTERVAL_MS,
                    constants::MAX_SETTINGS_POLL_INTERVAL_MS
                ),
                constants::SETTINGS_POLL_INTERVAL_MS.to_string(),
            );
        }
    }

    if let Some(file) = raw.settings.file.filter(|f| !f.trim().is_empty()) {
        config.settings_file = Some(PathBuf::from(file));
    }

    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    (config, warnings)
}
