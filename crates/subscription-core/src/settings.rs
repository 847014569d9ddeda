use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::InvalidRowPolicy;

/// Accepted `--histogram-bins` values.
pub const HISTOGRAM_BINS: std::ops::RangeInclusive<usize> = 1..=500;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Subscription analytics over a CSV export of subscription transactions
#[derive(Parser, Debug, Clone)]
#[command(
    name = "subscription-dashboard",
    about = "Subscription analytics: KPIs, monthly trends, cohorts, rankings and cross-tabs",
    version
)]
pub struct Settings {
    /// CSV file, or a directory scanned recursively for *.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Which group of views to print
    #[arg(long, default_value = "all", value_parser = ["overview", "customers", "plans", "cohort", "raw", "all"])]
    pub view: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Allowed plan type (repeatable; defaults to every plan type in the data)
    #[arg(long = "plan-type")]
    pub plan_types: Vec<String>,

    /// Allowed meal frequency (repeatable; defaults to every frequency in the data)
    #[arg(long = "meal-frequency")]
    pub meal_frequencies: Vec<String>,

    /// Inclusive lower price bound (defaults to the dataset minimum)
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Inclusive upper price bound (defaults to the dataset maximum)
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Number of rows in the ranking tables
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    /// Number of bins in the price histogram
    #[arg(long, default_value = "20", value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=500))]
    pub histogram_bins: usize,

    /// What to do with rows that fail to parse
    #[arg(long, default_value = "reject", value_parser = ["reject", "skip"])]
    pub on_invalid_row: String,

    /// Write the filtered records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted presentation preferences saved to
/// `~/.subscription-dashboard/last_used.json`.
///
/// Filter criteria are deliberately not persisted: they depend on the
/// dataset being loaded.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram_bins: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_invalid_row: Option<String>,
}

impl LastUsedParams {
    /// `~/.subscription-dashboard/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".subscription-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("could not clear {}: {}", config_path.display(), e);
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // NOTE: clap stores arg ids by field name (underscores).
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_n") {
            if let Some(v) = last.top_n {
                settings.top_n = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "histogram_bins") {
            if let Some(v) = last.histogram_bins.filter(|b| HISTOGRAM_BINS.contains(b)) {
                settings.histogram_bins = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "on_invalid_row") {
            if let Some(v) = last.on_invalid_row.filter(|v| v.parse::<InvalidRowPolicy>().is_ok()) {
                settings.on_invalid_row = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!("could not persist last-used params: {}", e);
        }

        settings
    }

    /// The parsed `--on-invalid-row` policy.
    pub fn invalid_row_policy(&self) -> InvalidRowPolicy {
        self.on_invalid_row.parse().unwrap_or_default()
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            format: Some(s.format.clone()),
            top_n: Some(s.top_n),
            histogram_bins: Some(s.histogram_bins),
            on_invalid_row: Some(s.on_invalid_row.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
