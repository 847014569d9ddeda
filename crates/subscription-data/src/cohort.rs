//! First-activity cohorts.
//!
//! Cohort membership comes from a customer's whole history, so these views
//! must be computed over the full dataset, never over a filtered selection:
//! narrowing the price range must not move a customer to another cohort.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use subscription_core::models::{month_key, SubscriptionRecord};

use crate::as_record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortRow {
    pub cohort_month: String,
    pub new_customers: usize,
}

/// Activity of one cohort in the months after it was acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortRetention {
    pub cohort_month: String,
    pub new_customers: usize,
    /// `active_by_offset[k]`: distinct cohort customers with a subscription
    /// starting `k` months after the cohort month. Index 0 equals
    /// `new_customers`.
    pub active_by_offset: Vec<usize>,
}

/// Earliest `start_date` of every customer.
fn first_starts<R: Borrow<SubscriptionRecord>>(records: &[R]) -> HashMap<&str, NaiveDate> {
    let mut first: HashMap<&str, NaiveDate> = HashMap::new();
    for record in records.iter().map(as_record) {
        first
            .entry(record.customer_id())
            .and_modify(|d| *d = (*d).min(record.start_date()))
            .or_insert(record.start_date());
    }
    first
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Number of customers whose first activity falls in each month, ascending.
///
/// Every customer lands in exactly one row, so the counts sum to the number
/// of distinct customers in `records`.
pub fn cohort_table<R: Borrow<SubscriptionRecord>>(records: &[R]) -> Vec<CohortRow> {
    let mut cohorts: BTreeMap<String, usize> = BTreeMap::new();
    for first in first_starts(records).into_values() {
        *cohorts.entry(month_key(first)).or_default() += 1;
    }

    cohorts
        .into_iter()
        .map(|(cohort_month, new_customers)| CohortRow {
            cohort_month,
            new_customers,
        })
        .collect()
}

/// Per-cohort retention triangle.
///
/// Every row has the same length: one more than the largest month offset
/// observed in any cohort.
pub fn retention_matrix<R: Borrow<SubscriptionRecord>>(records: &[R]) -> Vec<CohortRetention> {
    let first = first_starts(records);

    // (cohort month index, offset) → distinct customers
    let mut active: HashMap<(i64, usize), HashSet<&str>> = HashMap::new();
    let mut max_offset = 0usize;
    for record in records.iter().map(as_record) {
        let cohort = month_index(first[record.customer_id()]);
        let offset = (month_index(record.start_date()) - cohort) as usize;
        max_offset = max_offset.max(offset);
        active
            .entry((cohort, offset))
            .or_default()
            .insert(record.customer_id());
    }

    let mut cohorts: BTreeMap<i64, (String, usize)> = BTreeMap::new();
    for date in first.values() {
        cohorts
            .entry(month_index(*date))
            .or_insert_with(|| (month_key(*date), 0))
            .1 += 1;
    }

    cohorts
        .into_iter()
        .map(|(index, (cohort_month, new_customers))| CohortRetention {
            cohort_month,
            new_customers,
            active_by_offset: (0..=max_offset)
                .map(|k| active.get(&(index, k)).map_or(0, HashSet::len))
                .collect(),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
