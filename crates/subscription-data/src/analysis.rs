//! Dashboard pipeline.
//!
//! Filters a [`Dataset`] and computes every view the reporting surface
//! renders, returning a [`DashboardViews`] ready for the presentation layer.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use subscription_core::error::Result;
use subscription_core::models::{Dimension, FilterCriteria, SubscriptionRecord};
use tracing::{debug, warn};

use crate::aggregator::{
    BucketCount, CategoryCount, CategoryRevenue, KpiSummary, MonthlyPoint, PriceBin, PriceSummary,
    SubscriptionAggregator,
};
use crate::cohort::{cohort_table, retention_matrix, CohortRetention, CohortRow};
use crate::crosstab::{crosstab, CellAggregate, CrossTab};
use crate::dataset::Dataset;
use crate::filter;
use crate::ranking::{top_combinations, top_customers, CustomerSpend, PlanCombination};

// ── Public types ──────────────────────────────────────────────────────────────

/// Tunables for the views that take a size parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Rows in the top-customer and top-combination tables.
    pub top_n: usize,
    /// Bins in the price histogram.
    pub histogram_bins: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            histogram_bins: 20,
        }
    }
}

/// Non-fatal conditions the presentation layer may want to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewWarning {
    /// The criteria selected no records; filtered views are empty or zero.
    EmptyResult,
    /// Rows were dropped while loading the dataset.
    SkippedRows { count: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetadata {
    /// RFC 3339 timestamp when the views were computed.
    pub generated_at: String,
    pub total_records: usize,
    pub filtered_records: usize,
    pub compute_time_seconds: f64,
}

/// Every derived view for one (dataset, criteria) pair.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardViews {
    pub criteria: FilterCriteria,
    pub kpi: KpiSummary,
    pub monthly: Vec<MonthlyPoint>,
    pub meal_frequency_counts: Vec<CategoryCount>,
    pub price_by_meal_frequency: Vec<PriceSummary>,
    pub top_customers: Vec<CustomerSpend>,
    pub price_histogram: Vec<PriceBin>,
    /// Computed over the full dataset; independent of `criteria`.
    pub cohorts: Vec<CohortRow>,
    /// Computed over the full dataset; independent of `criteria`.
    pub retention: Vec<CohortRetention>,
    pub revenue_by_plan: Vec<CategoryRevenue>,
    pub plan_meal_matrix: CrossTab,
    pub duration_buckets: Vec<BucketCount>,
    pub revenue_by_duration: Vec<CategoryRevenue>,
    pub top_combinations: Vec<PlanCombination>,
    pub price_by_plan: Vec<PriceSummary>,
    pub warnings: Vec<ViewWarning>,
    pub metadata: DashboardMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Compute every dashboard view.
///
/// 1. Filter the dataset with `criteria`.
/// 2. Compute the filtered views (KPIs, series, tables, matrix).
/// 3. Compute the cohort views over the full dataset.
/// 4. Attach warnings and metadata.
///
/// Fails only when `criteria` is malformed; an empty selection is reported as
/// [`ViewWarning::EmptyResult`].
pub fn build_dashboard(
    dataset: &Dataset,
    criteria: &FilterCriteria,
    options: &DashboardOptions,
) -> Result<DashboardViews> {
    build_dashboard_with_selection(dataset, criteria, options).map(|(views, _)| views)
}

/// Like [`build_dashboard`], also returning the filtered records the views
/// were computed from, in dataset order.
pub fn build_dashboard_with_selection<'a>(
    dataset: &'a Dataset,
    criteria: &FilterCriteria,
    options: &DashboardOptions,
) -> Result<(DashboardViews, Vec<&'a SubscriptionRecord>)> {
    let start = Instant::now();

    // ── Step 1: Filter ────────────────────────────────────────────────────────
    let filtered = filter::apply(dataset.records(), criteria)?;

    // ── Step 2: Filtered views ────────────────────────────────────────────────
    let kpi = SubscriptionAggregator::kpi_summary(&filtered);
    let monthly = SubscriptionAggregator::monthly_series(&filtered);
    let meal_frequency_counts =
        SubscriptionAggregator::category_counts(&filtered, Dimension::MealFrequency);
    let price_by_meal_frequency =
        SubscriptionAggregator::price_distribution(&filtered, Dimension::MealFrequency);
    let price_by_plan = SubscriptionAggregator::price_distribution(&filtered, Dimension::PlanType);
    let price_histogram = SubscriptionAggregator::price_histogram(&filtered, options.histogram_bins);
    let revenue_by_plan =
        SubscriptionAggregator::revenue_by_category(&filtered, Dimension::PlanType);
    let duration_buckets = SubscriptionAggregator::duration_histogram(&filtered);
    let revenue_by_duration =
        SubscriptionAggregator::revenue_by_category(&filtered, Dimension::DurationCategory);
    let plan_meal_matrix = crosstab(
        &filtered,
        Dimension::PlanType,
        Dimension::MealFrequency,
        CellAggregate::Count,
    );

    // ── Step 3: Cohorts (full history) ────────────────────────────────────────
    let cohorts = cohort_table(dataset.records());
    let retention = retention_matrix(dataset.records());

    // ── Step 4: Warnings and metadata ─────────────────────────────────────────
    let mut warnings = Vec::new();
    let skipped = dataset.report().skipped.len();
    if skipped > 0 {
        warnings.push(ViewWarning::SkippedRows { count: skipped });
    }
    if filtered.is_empty() {
        warn!(
            "criteria selected none of {} records; filtered views are empty",
            dataset.len()
        );
        warnings.push(ViewWarning::EmptyResult);
    }

    let metadata = DashboardMetadata {
        generated_at: Utc::now().to_rfc3339(),
        total_records: dataset.len(),
        filtered_records: filtered.len(),
        compute_time_seconds: start.elapsed().as_secs_f64(),
    };
    debug!(
        "dashboard computed: {} of {} records in {:.4}s",
        metadata.filtered_records, metadata.total_records, metadata.compute_time_seconds
    );

    let views = DashboardViews {
        criteria: criteria.clone(),
        kpi,
        monthly,
        meal_frequency_counts,
        price_by_meal_frequency,
        top_customers: top_customers(&filtered, options.top_n),
        price_histogram,
        cohorts,
        retention,
        revenue_by_plan,
        plan_meal_matrix,
        duration_buckets,
        revenue_by_duration,
        top_combinations: top_combinations(&filtered, options.top_n),
        price_by_plan,
        warnings,
        metadata,
    };
    Ok((views, filtered))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
