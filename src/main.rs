// ChatSift - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Settings store loading
// 4. Dispatch to `watch`, `check` or `rules`

use chatsift::app::controller::FilterController;
use chatsift::app::entry_state;
use chatsift::app::store::{SettingsFile, SettingsWatcher, StoredState};
use chatsift::app::tail::{self, ChatTail, TailProgress};
use chatsift::core::chat_log::ChatLog;
use chatsift::core::classifier::classify;
use chatsift::core::model::{ChatEntry, Classification, EntryId, Fragment};
use chatsift::core::rules::RuleKind;
use chatsift::platform::config::{self, AppConfig, PlatformPaths};
use chatsift::util::constants;
use chatsift::util::error::{self, ChatSiftError};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ChatSift - live chat stream filter.
///
/// Hides spam messages (shouting, repeated characters, link spam, keywords,
/// emote walls) from a chat log as it is written.
#[derive(Parser, Debug)]
#[command(name = "chatsift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Filter settings file (defaults to the platform data directory).
    #[arg(short = 's', long = "settings", global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a JSON-lines chat file and print the messages that pass.
    Watch {
        /// Chat file to follow.
        path: PathBuf,

        /// Replay the existing content before following new lines.
        #[arg(long = "from-start")]
        from_start: bool,
    },

    /// Classify every message of a chat file once and report the verdicts.
    Check {
        /// Chat file to classify.
        path: PathBuf,

        /// Emit one JSON object per message instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List the rules with their enabled state and the current settings.
    Rules,
}

fn main() {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let (app_config, config_warnings) = config::load_config(&paths.config_dir);

    chatsift::util::logging::init(cli.debug, app_config.log_level.as_deref());
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "ChatSift starting"
    );

    let settings_path = cli
        .settings
        .clone()
        .or_else(|| app_config.settings_file.clone())
        .unwrap_or_else(|| paths.default_settings_file());
    let store = SettingsFile::new(settings_path);
    let stored = store.get().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Settings store unreadable; using defaults");
        StoredState::new()
    });

    let (controller, errors) = FilterController::from_stored(&stored);
    for e in &errors {
        tracing::warn!(error = %e, "Ignoring malformed setting");
    }

    let result = match cli.command {
        Command::Watch { path, from_start } => {
            run_watch(controller, &store, stored, &app_config, path, from_start);
            Ok(())
        }
        Command::Check { path, json } => run_check(&controller, &path, json),
        Command::Rules => {
            run_rules(&controller, store.path());
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

// =============================================================================
// watch
// =============================================================================

fn run_watch(
    mut controller: FilterController,
    store: &SettingsFile,
    stored: StoredState,
    app_config: &AppConfig,
    path: PathBuf,
    from_start: bool,
) {
    let mut log = ChatLog::new(app_config.chat_capacity);
    controller.start_or_stop(Some(&mut log));

    let mut settings_watcher = SettingsWatcher::new();
    settings_watcher.start_watch(
        store.clone(),
        stored,
        app_config.settings_poll_interval_ms,
    );

    let mut chat_tail = ChatTail::new();
    chat_tail.start_tail(path, from_start, app_config.tail_poll_interval_ms);

    loop {
        for msg in chat_tail.poll_progress(constants::MAX_TAIL_MESSAGES_PER_TICK) {
            match msg {
                TailProgress::Started { path } => {
                    tracing::info!(file = %path.display(), "Following chat file");
                }
                TailProgress::NewEntries { entries } => {
                    let ids = log.append(entries);
                    controller.pump(Some(&mut log));
                    print_visible(&log, &ids);
                }
                TailProgress::FileError { path, message } => {
                    tracing::warn!(file = %path.display(), "{message}");
                }
                TailProgress::Stopped => {}
            }
        }

        for changes in settings_watcher.poll_changes() {
            controller.on_storage_changed(&changes, Some(&mut log));
        }

        if !chat_tail.is_active() {
            tracing::info!("Chat tail ended");
            break;
        }
        std::thread::sleep(Duration::from_millis(constants::EVENT_LOOP_TICK_MS));
    }

    settings_watcher.stop_watch();
}

/// Print newly appended entries that are not hidden.
fn print_visible(log: &ChatLog, ids: &[EntryId]) {
    for entry in ids.iter().filter_map(|id| log.get(*id)) {
        if !entry.view.hidden {
            println!("{}", render_line(entry));
        }
    }
}

/// One chat line as shown on the terminal. Reviewed entries carry a bar
/// accent in front of the author.
fn render_line(entry: &ChatEntry) -> String {
    let accent = if entry.view.reviewed { "▍" } else { " " };
    let body = entry
        .content
        .fragments
        .iter()
        .map(|f| match f {
            Fragment::Text { text } => text.trim().to_string(),
            Fragment::Link { text, href } if text.trim().is_empty() => href.clone(),
            Fragment::Link { text, .. } => text.trim().to_string(),
            Fragment::Emote { name } => format!(":{name}:"),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {accent}{}: {body}",
        entry.received_at.with_timezone(&Local).format("%H:%M:%S"),
        entry.author_or_unknown()
    )
}

// =============================================================================
// check
// =============================================================================

#[derive(Serialize)]
struct CheckRecord<'a> {
    line: u64,
    author: &'a str,
    #[serde(flatten)]
    classification: &'a Classification,
}

fn run_check(controller: &FilterController, path: &Path, json: bool) -> error::Result<()> {
    let text = std::fs::read_to_string(path).map_err(|e| ChatSiftError::Io {
        path: path.to_path_buf(),
        operation: "read chat file",
        source: e,
    })?;
    let (numbered, errors) = tail::decode_numbered_lines(&text, 1);
    for e in &errors {
        tracing::warn!(error = %e, "Skipping malformed entry");
    }

    let config = controller.config();
    let (line_numbers, entries): (Vec<u64>, Vec<_>) = numbered.into_iter().unzip();
    let mut log = ChatLog::new(entries.len());
    log.append(entries);

    let mut suppressed = 0;
    for (entry, &line) in log.entries_mut().zip(&line_numbers) {
        let result = classify(&entry.content, &config);
        entry_state::apply(entry, &result);
        if result.is_suppressed() {
            suppressed += 1;
        }
        if json {
            let record = CheckRecord {
                line,
                author: entry.author_or_unknown(),
                classification: &result,
            };
            match serde_json::to_string(&record) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Cannot serialise verdict"),
            }
        } else {
            let verdict = match result.matched_rule() {
                Some(rule) => format!("HIDE [{}]", rule.name()),
                None => "PASS".to_string(),
            };
            println!("{verdict:<28} {}", render_line(entry));
        }
    }

    if !json {
        println!(
            "{} messages, {suppressed} filtered, {} malformed",
            log.len(),
            errors.len()
        );
    }
    if !controller.is_enabled() {
        tracing::info!("Filtering is switched off in the settings store; verdicts shown anyway");
    }
    Ok(())
}

// =============================================================================
// rules
// =============================================================================

fn run_rules(controller: &FilterController, settings_path: &Path) {
    let config = controller.config();
    println!("Settings file: {}", settings_path.display());
    println!(
        "Filtering: {}",
        if controller.is_enabled() { "on" } else { "off" }
    );
    println!();
    for rule in RuleKind::ALL {
        let state = if config.is_active(rule) { "on " } else { "off" };
        println!("  [{state}] {:<8} {}", rule.id(), rule.name());
    }
    println!();
    match serde_json::to_string_pretty(config.settings()) {
        Ok(s) => println!("{s}"),
        Err(e) => tracing::warn!(error = %e, "Cannot serialise settings"),
    }
}
