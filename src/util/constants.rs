// ChatSift - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "ChatSift";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "ChatSift";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix carried by every suppression record so they can be grepped out of
/// mixed log output.
pub const FILTER_LOG_PREFIX: &str = "ChatSift";

// =============================================================================
// Rule defaults
// =============================================================================

/// Absolute floor for the caps rule: at most this many emphasis characters
/// never trigger, whatever the ratio.
pub const CAPS_MIN_COUNT: usize = 5;

/// Default emphasis ratio above which the caps rule matches.
pub const DEFAULT_CAPS_RATIO: f64 = 0.6;

/// Whether digits count as emphasis characters by default.
pub const DEFAULT_CAPS_INCLUDE_NUMBERS: bool = true;

/// Default repetition threshold. Runs strictly longer than this match.
pub const DEFAULT_REPEAT_COUNT: usize = 4;

/// Minimum accepted repetition threshold.
pub const MIN_REPEAT_COUNT: usize = 1;

/// Maximum accepted repetition threshold.
pub const MAX_REPEAT_COUNT: usize = 500;

/// Default `|`-separated domain suffixes for the link rule.
pub const DEFAULT_LINK_PATTERN: &str = "com|net|xyz|ru|info|gg|top|click|win|link|tk";

/// Default maximum number of emotes before an entry is suppressed.
pub const DEFAULT_MAX_EMOTES: usize = 5;

/// Maximum accepted emote threshold.
pub const MAX_MAX_EMOTES: usize = 1_000;

/// Default keyword pattern (empty: the keyword rule never matches).
pub const DEFAULT_KEYWORD_PATTERN: &str = "";

/// Whether filtering is switched on when the settings store has no value.
pub const DEFAULT_FILTERING_ENABLED: bool = true;

// =============================================================================
// Pattern limits
// =============================================================================

/// Maximum length (in characters) of a user-supplied pattern.
pub const MAX_PATTERN_LENGTH: usize = 4_096;

/// Compiled size limit for user-supplied patterns (bytes). Keeps a large
/// alternation from blowing up the compiled automaton.
pub const PATTERN_SIZE_LIMIT: usize = 1024 * 1024; // 1 MiB

// =============================================================================
// Chat log
// =============================================================================

/// Default number of entries retained by the chat log before the oldest are
/// evicted.
pub const DEFAULT_CHAT_CAPACITY: usize = 150;

/// Minimum user-configurable chat capacity.
pub const MIN_CHAT_CAPACITY: usize = 1;

/// Maximum user-configurable chat capacity.
pub const MAX_CHAT_CAPACITY: usize = 100_000;

/// Author sentinel used when an entry carries no author identifier.
pub const UNKNOWN_AUTHOR: &str = "unknown";

// =============================================================================
// Live tail limits
// =============================================================================

/// How often the tail watcher polls the chat file for new content (ms).
pub const TAIL_POLL_INTERVAL_MS: u64 = 250;

/// How often the cancel flag is checked within each poll sleep interval (ms).
pub const TAIL_CANCEL_CHECK_INTERVAL_MS: u64 = 50;

/// Minimum user-configurable tail poll interval (ms).
pub const MIN_TAIL_POLL_INTERVAL_MS: u64 = 50;

/// Maximum user-configurable tail poll interval (ms).
pub const MAX_TAIL_POLL_INTERVAL_MS: u64 = 10_000; // 10 s

/// Maximum number of bytes read from the chat file per poll tick.
pub const MAX_TAIL_READ_BYTES_PER_TICK: usize = 512 * 1_024; // 512 KiB

/// Upper bound on an in-progress (newline-less) line carried between ticks.
/// A writer that never emits a newline cannot grow memory without bound.
pub const MAX_TAIL_PARTIAL_BYTES: usize = MAX_TAIL_READ_BYTES_PER_TICK * 4; // 2 MiB

// =============================================================================
// Settings store
// =============================================================================

/// How often the settings file is checked for changes (ms).
pub const SETTINGS_POLL_INTERVAL_MS: u64 = 500;

/// Minimum user-configurable settings poll interval (ms).
pub const MIN_SETTINGS_POLL_INTERVAL_MS: u64 = 100;

/// Maximum user-configurable settings poll interval (ms).
pub const MAX_SETTINGS_POLL_INTERVAL_MS: u64 = 60_000;

/// How often the cancel flag is checked within a settings poll sleep (ms).
pub const SETTINGS_CANCEL_CHECK_INTERVAL_MS: u64 = 50;

/// Maximum settings file size accepted (bytes).
pub const MAX_SETTINGS_FILE_SIZE: u64 = 64 * 1024; // 64 KB

// =============================================================================
// Main loop
// =============================================================================

/// Sleep between main-loop iterations of `chatsift watch` (ms).
pub const EVENT_LOOP_TICK_MS: u64 = 50;

/// Maximum tail messages drained per main-loop iteration.
pub const MAX_TAIL_MESSAGES_PER_TICK: usize = 200;

// =============================================================================
// Logging / files
// =============================================================================

/// Default log level when neither RUST_LOG, --debug nor config is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum characters of entry text included in a suppression record.
pub const MAX_RECORD_TEXT_CHARS: usize = 200;

/// Application config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Filter settings store file name.
pub const SETTINGS_FILE_NAME: &str = "settings.json";
