mod bootstrap;
mod render;

use anyhow::{bail, Result};
use subscription_core::models::FilterCriteria;
use subscription_core::settings::Settings;
use subscription_data::analysis::{build_dashboard_with_selection, DashboardOptions};
use subscription_data::export::export_csv;
use subscription_data::reader::load_dataset;
use subscription_data::Dataset;

use render::Section;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Subscription Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("View: {}, Format: {}", settings.view, settings.format);

    let Some(data_path) = settings.data.clone().or_else(bootstrap::discover_data_path) else {
        bail!("no subscription data found; pass --data <FILE|DIR> or place PS_Data.csv in the working directory");
    };

    let dataset = load_dataset(&data_path, settings.invalid_row_policy())?;
    tracing::info!(
        "Loaded {} records from {} file(s)",
        dataset.len(),
        dataset.report().files.len()
    );

    let criteria = criteria_from_settings(&settings, &dataset)?;
    let options = DashboardOptions {
        top_n: settings.top_n,
        histogram_bins: settings.histogram_bins,
    };
    let (views, selected) = build_dashboard_with_selection(&dataset, &criteria, &options)?;
    let sections = Section::for_view(&settings.view);

    if let Some(path) = &settings.export {
        let written = export_csv(path, &selected)?;
        tracing::info!("Exported {} filtered records to {}", written, path.display());
    }

    match settings.format.as_str() {
        "json" => {
            let doc = render::render_json(&views, &sections, &selected)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        _ => print!("{}", render::render_text(&views, &sections, &selected)),
    }

    Ok(())
}

/// Criteria from the CLI flags, falling back to the dataset's all-inclusive
/// defaults for anything not given.
fn criteria_from_settings(settings: &Settings, dataset: &Dataset) -> Result<FilterCriteria> {
    let defaults = dataset.default_criteria();

    let plan_types = if settings.plan_types.is_empty() {
        defaults.plan_types
    } else {
        settings.plan_types.iter().cloned().collect()
    };
    let meal_frequencies = if settings.meal_frequencies.is_empty() {
        defaults.meal_frequencies
    } else {
        settings.meal_frequencies.iter().cloned().collect()
    };

    let criteria = FilterCriteria::new(
        plan_types,
        meal_frequencies,
        settings.min_price.unwrap_or(defaults.min_price),
        settings.max_price.unwrap_or(defaults.max_price),
    )?;
    Ok(criteria)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
