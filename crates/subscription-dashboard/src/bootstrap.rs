use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APP_DIR: &str = ".subscription-dashboard";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.subscription-dashboard/` and its `data/` and `logs/`
/// subdirectories exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(&app_dir)?;
    std::fs::create_dir_all(app_dir.join("data"))?;
    std::fs::create_dir_all(app_dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name to an [`EnvFilter`] directive.
fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so that table and JSON output on stdout stays clean.
/// When `log_file` is given, the same events are appended to it without ANSI
/// colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Locate the subscription data when `--data` is not given.
///
/// Checks, in order, and returns the first that exists:
/// 1. `./PS_Data.csv`
/// 2. `./data/`
/// 3. `~/.subscription-dashboard/data/` (only if it holds at least one file)
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_path_in(&cwd, dirs::home_dir().as_deref())
}

fn discover_data_path_in(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let bundled = cwd.join("PS_Data.csv");
    if bundled.is_file() {
        return Some(bundled);
    }
    let local = cwd.join("data");
    if local.is_dir() {
        return Some(local);
    }
    let user = home?.join(APP_DIR).join("data");
    let populated = std::fs::read_dir(&user)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    populated.then_some(user)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
