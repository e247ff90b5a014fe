// ChatSift - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation.
// Every error here is recoverable: callers log it and degrade to
// "pass through unfiltered" rather than halting the stream.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal error for a CLI command. Everything below this level is recovered
/// from and logged instead.
#[derive(Debug)]
pub enum ChatSiftError {
    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for ChatSiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ChatSiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings errors (ConfigurationMalformed)
// ---------------------------------------------------------------------------

/// Errors raised while merging filter settings or reading the settings store.
///
/// None of these is fatal: the offending value is replaced by the
/// last-known-good value and the error is reported as a warning.
#[derive(Debug)]
pub enum SettingsError {
    /// A value expected to be a boolean was something else.
    NotABoolean { key: String, value: String },

    /// A value expected to be a number was something else.
    NotANumber { key: String, value: String },

    /// A value expected to be a string was something else.
    NotAString { key: String, value: String },

    /// A section expected to be an object was something else.
    NotAnObject { key: String },

    /// A numeric value is outside its accepted range.
    OutOfRange {
        key: String,
        value: String,
        expected: String,
    },

    /// A pattern did not compile.
    InvalidPattern {
        key: String,
        pattern: String,
        source: regex::Error,
    },

    /// A pattern exceeds the maximum allowed length.
    PatternTooLong {
        key: String,
        length: usize,
        max_length: usize,
    },

    /// The settings file is not valid JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The settings file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// I/O error reading or writing the settings file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotABoolean { key, value } => {
                write!(f, "'{key}' = {value} is not a boolean")
            }
            Self::NotANumber { key, value } => {
                write!(f, "'{key}' = {value} is not a number")
            }
            Self::NotAString { key, value } => {
                write!(f, "'{key}' = {value} is not a string")
            }
            Self::NotAnObject { key } => write!(f, "'{key}' is not an object"),
            Self::OutOfRange {
                key,
                value,
                expected,
            } => write!(f, "'{key}' = {value} is out of range. Expected: {expected}"),
            Self::InvalidPattern {
                key,
                pattern,
                source,
            } => write!(f, "'{key}': invalid pattern '{pattern}': {source}"),
            Self::PatternTooLong {
                key,
                length,
                max_length,
            } => write!(
                f,
                "'{key}': pattern is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::Json { path, source } => {
                write!(f, "Settings file '{}' is not valid JSON: {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Settings file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Settings I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry errors (EntryMalformed)
// ---------------------------------------------------------------------------

/// Errors decoding a single chat entry.
#[derive(Debug)]
pub enum EntryError {
    /// A chat file line is not a valid entry record.
    Decode {
        line_number: u64,
        source: serde_json::Error,
    },
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode {
                line_number,
                source,
            } => write!(f, "line {line_number}: malformed chat entry: {source}"),
        }
    }
}

impl std::error::Error for EntryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Source errors (SourceUnavailable)
// ---------------------------------------------------------------------------

/// Errors raised when the chat log container cannot be reached.
#[derive(Debug)]
pub enum SourceError {
    /// No chat log container is attached; the operation was skipped.
    Unavailable { operation: &'static str },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { operation } => {
                write!(f, "chat log not present; skipped {operation}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to config.toml loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for CLI command results.
pub type Result<T> = std::result::Result<T, ChatSiftError>;
