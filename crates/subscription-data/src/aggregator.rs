//! Grouped summary views over a record slice.
//!
//! Each view is a stateless reduction with a documented output order:
//!
//! * monthly series – ascending `YYYY-MM`; months without records are absent.
//! * category counts – descending count, ties in first-encountered order.
//! * duration buckets / revenue by duration – bucket order, the four regular
//!   buckets always present, `unbucketed` only when non-empty.
//! * revenue by any other dimension – ascending label.
//! * price distributions – first-encountered category order.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use subscription_core::models::{Dimension, DurationCategory, SubscriptionRecord};

use crate::as_record;

// ── View types ────────────────────────────────────────────────────────────────

/// Headline figures of a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    /// Distinct `customer_id`s.
    pub customers: usize,
    pub records: usize,
    pub revenue: f64,
    /// Mean `total_price` per record; `None` (JSON `null`) for an empty
    /// selection.
    pub mean_revenue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub customers: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub category: DurationCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub label: String,
    pub revenue: f64,
}

/// One equal-width price bin, `[lower, upper)` except for the last bin which
/// is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Five-number summary plus mean, for box plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

// ── SubscriptionAggregator ────────────────────────────────────────────────────

/// Stateless helper computing the aggregate views.
pub struct SubscriptionAggregator;

impl SubscriptionAggregator {
    /// Distinct customers, total revenue and mean revenue per record.
    pub fn kpi_summary<R: Borrow<SubscriptionRecord>>(records: &[R]) -> KpiSummary {
        let mut customers: HashSet<&str> = HashSet::new();
        let mut revenue = 0.0;
        for record in records.iter().map(as_record) {
            customers.insert(record.customer_id());
            revenue += record.total_price();
        }

        let mean_revenue = if records.is_empty() {
            None
        } else {
            Some(revenue / records.len() as f64)
        };

        KpiSummary {
            customers: customers.len(),
            records: records.len(),
            revenue,
            mean_revenue,
        }
    }

    /// Distinct customers and revenue per `month`, ascending.
    pub fn monthly_series<R: Borrow<SubscriptionRecord>>(records: &[R]) -> Vec<MonthlyPoint> {
        let mut map: BTreeMap<&str, (HashSet<&str>, f64)> = BTreeMap::new();
        for record in records.iter().map(as_record) {
            let (customers, revenue) = map.entry(record.month()).or_default();
            customers.insert(record.customer_id());
            *revenue += record.total_price();
        }

        map.into_iter()
            .map(|(month, (customers, revenue))| MonthlyPoint {
                month: month.to_string(),
                customers: customers.len(),
                revenue,
            })
            .collect()
    }

    /// Occurrences of each value of `dimension`, most frequent first.
    pub fn category_counts<R: Borrow<SubscriptionRecord>>(
        records: &[R],
        dimension: Dimension,
    ) -> Vec<CategoryCount> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<CategoryCount> = Vec::new();
        for record in records.iter().map(as_record) {
            let label = record.dimension(dimension);
            let slot = *index.entry(label).or_insert_with(|| {
                counts.push(CategoryCount {
                    label: label.to_string(),
                    count: 0,
                });
                counts.len() - 1
            });
            counts[slot].count += 1;
        }

        // Stable: equal counts keep first-encountered order.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }

    /// Records per duration bucket.
    pub fn duration_histogram<R: Borrow<SubscriptionRecord>>(records: &[R]) -> Vec<BucketCount> {
        let mut map: BTreeMap<DurationCategory, usize> =
            DurationCategory::BUCKETS.into_iter().map(|c| (c, 0)).collect();
        for record in records.iter().map(as_record) {
            *map.entry(record.duration_category()).or_default() += 1;
        }

        map.into_iter()
            .map(|(category, count)| BucketCount { category, count })
            .collect()
    }

    /// Sum of `total_price` per value of `dimension`.
    pub fn revenue_by_category<R: Borrow<SubscriptionRecord>>(
        records: &[R],
        dimension: Dimension,
    ) -> Vec<CategoryRevenue> {
        let mut sums: HashMap<&str, f64> = HashMap::new();
        if dimension == Dimension::DurationCategory {
            for bucket in DurationCategory::BUCKETS {
                sums.insert(bucket.label(), 0.0);
            }
        }
        for record in records.iter().map(as_record) {
            *sums.entry(record.dimension(dimension)).or_default() += record.total_price();
        }

        let mut labels: Vec<String> = sums.keys().map(|l| l.to_string()).collect();
        dimension.sort_labels(&mut labels);
        labels
            .into_iter()
            .map(|label| {
                let revenue = sums[label.as_str()];
                CategoryRevenue { label, revenue }
            })
            .collect()
    }

    /// Equal-width histogram of `total_price` with `bins` bins (at least 1).
    pub fn price_histogram<R: Borrow<SubscriptionRecord>>(records: &[R], bins: usize) -> Vec<PriceBin> {
        let prices: Vec<f64> = records.iter().map(as_record).map(|r| r.total_price()).collect();
        let Some((min, max)) = bounds(&prices) else {
            return Vec::new();
        };

        let bins = bins.max(1);
        let width = (max - min) / bins as f64;
        if width <= 0.0 {
            return vec![PriceBin {
                lower: min,
                upper: max,
                count: prices.len(),
            }];
        }

        let mut counts = vec![0usize; bins];
        for price in &prices {
            let slot = (((price - min) / width).floor() as usize).min(bins - 1);
            counts[slot] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| PriceBin {
                lower: min + width * i as f64,
                upper: if i + 1 == bins {
                    max
                } else {
                    min + width * (i + 1) as f64
                },
                count,
            })
            .collect()
    }

    /// Box-plot summary of `total_price` per value of `dimension`.
    pub fn price_distribution<R: Borrow<SubscriptionRecord>>(
        records: &[R],
        dimension: Dimension,
    ) -> Vec<PriceSummary> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<f64>)> = Vec::new();
        for record in records.iter().map(as_record) {
            let label = record.dimension(dimension);
            let slot = *index.entry(label).or_insert_with(|| {
                groups.push((label, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record.total_price());
        }

        groups
            .into_iter()
            .map(|(label, mut prices)| {
                prices.sort_by(f64::total_cmp);
                let count = prices.len();
                PriceSummary {
                    label: label.to_string(),
                    count,
                    min: prices[0],
                    q1: percentile(&prices, 25.0),
                    median: percentile(&prices, 50.0),
                    q3: percentile(&prices, 75.0),
                    max: prices[count - 1],
                    mean: prices.iter().sum::<f64>() / count as f64,
                }
            })
            .collect()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `p`-th percentile of a **sorted** slice with linear interpolation between
/// closest ranks. Returns `0.0` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
