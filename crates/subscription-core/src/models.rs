use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Format `date` as the `YYYY-MM` month key used for grouping.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

// ── SubscriptionRecord ────────────────────────────────────────────────────────

/// A single subscription transaction after normalisation.
///
/// Records are immutable: the derived `month` is computed once from
/// `start_date` in [`SubscriptionRecord::new`] and can never drift from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRecord {
    customer_id: String,
    customer_name: String,
    plan_type: String,
    meal_frequency: String,
    start_date: NaiveDate,
    duration_days: u32,
    total_price: f64,
    month: String,
}

impl SubscriptionRecord {
    pub fn new(
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
        plan_type: impl Into<String>,
        meal_frequency: impl Into<String>,
        start_date: NaiveDate,
        duration_days: u32,
        total_price: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            customer_name: customer_name.into(),
            plan_type: plan_type.into(),
            meal_frequency: meal_frequency.into(),
            start_date,
            duration_days,
            total_price,
            month: month_key(start_date),
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn plan_type(&self) -> &str {
        &self.plan_type
    }

    pub fn meal_frequency(&self) -> &str {
        &self.meal_frequency
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    /// `YYYY-MM` month of `start_date`.
    pub fn month(&self) -> &str {
        &self.month
    }

    /// Bucket of `duration_days`, derived on demand.
    pub fn duration_category(&self) -> DurationCategory {
        DurationCategory::from_days(i64::from(self.duration_days))
    }

    /// The string value of `dimension` for this record.
    pub fn dimension(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::CustomerId => &self.customer_id,
            Dimension::CustomerName => &self.customer_name,
            Dimension::PlanType => &self.plan_type,
            Dimension::MealFrequency => &self.meal_frequency,
            Dimension::Month => &self.month,
            Dimension::DurationCategory => self.duration_category().label(),
        }
    }

    /// The numeric value of `metric` for this record.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::TotalPrice => self.total_price,
            Metric::DurationDays => f64::from(self.duration_days),
            Metric::Count => 1.0,
        }
    }
}

// ── DurationCategory ──────────────────────────────────────────────────────────

/// Left-closed, right-open duration bins.
///
/// | days        | category       |
/// |-------------|----------------|
/// | `[0, 7)`    | `"0-7 days"`   |
/// | `[7, 15)`   | `"8-15 days"`  |
/// | `[15, 31)`  | `"16-30 days"` |
/// | `[31, 100)` | `"31+ days"`   |
/// | otherwise   | `"unbucketed"` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationCategory {
    #[serde(rename = "0-7 days")]
    UpToWeek,
    #[serde(rename = "8-15 days")]
    UpToFortnight,
    #[serde(rename = "16-30 days")]
    UpToMonth,
    #[serde(rename = "31+ days")]
    Extended,
    #[serde(rename = "unbucketed")]
    Unbucketed,
}

impl DurationCategory {
    /// The four regular buckets in display order (excludes `Unbucketed`).
    pub const BUCKETS: [DurationCategory; 4] = [
        DurationCategory::UpToWeek,
        DurationCategory::UpToFortnight,
        DurationCategory::UpToMonth,
        DurationCategory::Extended,
    ];

    pub fn from_days(days: i64) -> Self {
        match days {
            0..=6 => DurationCategory::UpToWeek,
            7..=14 => DurationCategory::UpToFortnight,
            15..=30 => DurationCategory::UpToMonth,
            31..=99 => DurationCategory::Extended,
            _ => DurationCategory::Unbucketed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationCategory::UpToWeek => "0-7 days",
            DurationCategory::UpToFortnight => "8-15 days",
            DurationCategory::UpToMonth => "16-30 days",
            DurationCategory::Extended => "31+ days",
            DurationCategory::Unbucketed => "unbucketed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::BUCKETS
            .into_iter()
            .chain(std::iter::once(DurationCategory::Unbucketed))
            .find(|c| c.label() == label)
    }
}

impl fmt::Display for DurationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Dimension / Metric ────────────────────────────────────────────────────────

/// A categorical field usable as a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    CustomerId,
    CustomerName,
    PlanType,
    MealFrequency,
    Month,
    DurationCategory,
}

impl Dimension {
    /// Canonical column name of the dimension.
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::CustomerId => "Customer_ID",
            Dimension::CustomerName => "Customer_Name",
            Dimension::PlanType => "Plan_Type",
            Dimension::MealFrequency => "Meal_Frequency",
            Dimension::Month => "Month",
            Dimension::DurationCategory => "Duration_Category",
        }
    }

    /// Sort `labels` ascending in this dimension's natural order.
    ///
    /// Duration categories follow bucket order; everything else is
    /// lexicographic (`YYYY-MM` months therefore sort chronologically).
    pub fn sort_labels(self, labels: &mut [String]) {
        match self {
            Dimension::DurationCategory => labels.sort_by_key(|l| {
                (
                    DurationCategory::from_label(l).unwrap_or(DurationCategory::Unbucketed),
                    l.clone(),
                )
            }),
            _ => labels.sort(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A numeric quantity that can be summed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalPrice,
    DurationDays,
    /// Every record contributes `1`.
    Count,
}

// ── InvalidRowPolicy ──────────────────────────────────────────────────────────

/// How the normaliser treats a row whose cells cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRowPolicy {
    /// Fail the whole batch on the first bad row.
    #[default]
    Reject,
    /// Drop the row and record it in the load report.
    Skip,
}

impl FromStr for InvalidRowPolicy {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(InvalidRowPolicy::Reject),
            "skip" => Ok(InvalidRowPolicy::Skip),
            other => Err(DashboardError::Config(format!(
                "unknown invalid-row policy: {other}"
            ))),
        }
    }
}

// ── FilterCriteria ────────────────────────────────────────────────────────────

/// The active conjunctive filter.
///
/// Empty allowed-sets exclude every record ("nothing selected"), they do not
/// disable the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub plan_types: BTreeSet<String>,
    pub meal_frequencies: BTreeSet<String>,
    pub min_price: f64,
    pub max_price: f64,
}

impl FilterCriteria {
    /// Build validated criteria.
    pub fn new<P, M>(plan_types: P, meal_frequencies: M, min_price: f64, max_price: f64) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let criteria = Self {
            plan_types: plan_types.into_iter().map(Into::into).collect(),
            meal_frequencies: meal_frequencies.into_iter().map(Into::into).collect(),
            min_price,
            max_price,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    /// Reject non-finite bounds and inverted ranges. Bounds are never swapped.
    pub fn validate(&self) -> Result<()> {
        if !self.min_price.is_finite() || !self.max_price.is_finite() {
            return Err(DashboardError::InvalidCriteria(format!(
                "price bounds must be finite (got {} ..= {})",
                self.min_price, self.max_price
            )));
        }
        if self.min_price > self.max_price {
            return Err(DashboardError::InvalidCriteria(format!(
                "min_price {} > max_price {}",
                self.min_price, self.max_price
            )));
        }
        Ok(())
    }

    /// `true` when `record` satisfies every predicate.
    pub fn matches(&self, record: &SubscriptionRecord) -> bool {
        self.plan_types.contains(record.plan_type())
            && self.meal_frequencies.contains(record.meal_frequency())
            && self.min_price <= record.total_price()
            && record.total_price() <= self.max_price
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
