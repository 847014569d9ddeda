//! The immutable, session-scoped record set.
//!
//! A [`Dataset`] is loaded once and then only ever read. Cloning is cheap
//! (the records live behind an [`Arc`]), so one dataset can back any number
//! of concurrent read-only view computations.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use subscription_core::models::{FilterCriteria, SubscriptionRecord};

// ── Load report ───────────────────────────────────────────────────────────────

/// A row dropped under [`InvalidRowPolicy::Skip`](subscription_core::InvalidRowPolicy::Skip).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RowIssue {
    /// File the row came from, when loaded from disk.
    pub file: Option<PathBuf>,
    /// 1-based data row number within its file (header excluded).
    pub row: usize,
    pub message: String,
}

/// Book-keeping produced while normalising the input.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadReport {
    /// Files read, in load order.
    pub files: Vec<PathBuf>,
    /// Data rows seen, including skipped ones.
    pub rows_read: usize,
    pub skipped: Vec<RowIssue>,
}

// ── Dataset ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[SubscriptionRecord]>,
    report: Arc<LoadReport>,
}

impl Dataset {
    pub fn new(records: Vec<SubscriptionRecord>) -> Self {
        Self::with_report(records, LoadReport::default())
    }

    pub fn with_report(records: Vec<SubscriptionRecord>, report: LoadReport) -> Self {
        Self {
            records: records.into(),
            report: Arc::new(report),
        }
    }

    pub fn records(&self) -> &[SubscriptionRecord] {
        &self.records
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct plan types in first-appearance order.
    pub fn plan_types(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.plan_type()))
    }

    /// Distinct meal frequencies in first-appearance order.
    pub fn meal_frequencies(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.meal_frequency()))
    }

    /// `(min, max)` of `total_price`, or `None` for an empty dataset.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        self.records.iter().map(|r| r.total_price()).fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
    }

    /// Criteria that admit every record: all plan types, all meal
    /// frequencies, and the price range widened to whole units
    /// (`[floor(min), ceil(max)]`).
    pub fn default_criteria(&self) -> FilterCriteria {
        let (min_price, max_price) = self
            .price_bounds()
            .map(|(lo, hi)| (lo.floor(), hi.ceil()))
            .unwrap_or((0.0, 0.0));
        FilterCriteria {
            plan_types: self.plan_types().into_iter().collect(),
            meal_frequencies: self.meal_frequencies().into_iter().collect(),
            min_price,
            max_price,
        }
    }
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(id: &str, plan: &str, meal: &str, price: f64) -> SubscriptionRecord {
        SubscriptionRecord::new(
            id,
            format!("Name {id}"),
            plan,
            meal,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            7,
            price,
        )
    }

    #[test]
    fn test_distinct_values_keep_first_appearance_order() {
        let ds = Dataset::new(vec![
            rec("A", "Keto", "Lunch", 100.0),
            rec("B", "Veg", "Dinner", 200.0),
            rec("C", "Keto", "Lunch+Dinner", 300.0),
            rec("D", "Vegan", "Dinner", 400.0),
        ]);
        assert_eq!(ds.plan_types(), vec!["Keto", "Veg", "Vegan"]);
        assert_eq!(ds.meal_frequencies(), vec!["Lunch", "Dinner", "Lunch+Dinner"]);
    }

    #[test]
    fn test_price_bounds() {
        let ds = Dataset::new(vec![
            rec("A", "Keto", "Lunch", 1499.5),
            rec("B", "Veg", "Dinner", 250.25),
        ]);
        assert_eq!(ds.price_bounds(), Some((250.25, 1499.5)));
        assert_eq!(Dataset::new(vec![]).price_bounds(), None);
    }

    #[test]
    fn test_default_criteria_admits_every_record() {
        let ds = Dataset::new(vec![
            rec("A", "Keto", "Lunch", 1499.5),
            rec("B", "Veg", "Dinner", 250.25),
        ]);
        let criteria = ds.default_criteria();
        assert_eq!(criteria.min_price, 250.0);
        assert_eq!(criteria.max_price, 1500.0);
        assert!(ds.records().iter().all(|r| criteria.matches(r)));
    }

    #[test]
    fn test_default_criteria_on_empty_dataset_is_valid() {
        let criteria = Dataset::new(vec![]).default_criteria();
        assert!(criteria.validate().is_ok());
        assert!(criteria.plan_types.is_empty());
    }

    #[test]
    fn test_clone_shares_records() {
        let ds = Dataset::new(vec![rec("A", "Keto", "Lunch", 100.0)]);
        let other = ds.clone();
        assert!(std::ptr::eq(ds.records().as_ptr(), other.records().as_ptr()));
    }
}
