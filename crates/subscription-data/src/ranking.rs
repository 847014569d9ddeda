//! Top-N rankings by a summed metric.

use std::borrow::Borrow;
use std::collections::HashMap;

use serde::Serialize;
use subscription_core::models::{Dimension, Metric, SubscriptionRecord};

use crate::as_record;

/// A group of records sharing the same key values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    /// One value per requested key field, in key-field order.
    pub keys: Vec<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub customer_name: String,
    pub total_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCombination {
    pub plan_type: String,
    pub meal_frequency: String,
    pub count: usize,
}

/// Group `records` by `key_fields`, sum `metric` per group, and return the
/// `n` largest groups in descending order.
///
/// Ties keep the order in which the groups first appeared in `records`.
/// `n` beyond the number of groups returns every group.
pub fn top_n<R: Borrow<SubscriptionRecord>>(
    records: &[R],
    n: usize,
    key_fields: &[Dimension],
    metric: Metric,
) -> Vec<RankedGroup> {
    let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<&str>, f64)> = Vec::new();

    for record in records.iter().map(as_record) {
        let key: Vec<&str> = key_fields.iter().map(|d| record.dimension(*d)).collect();
        let slot = match index.get(&key) {
            Some(slot) => *slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, 0.0));
                groups.len() - 1
            }
        };
        groups[slot].1 += record.metric(metric);
    }

    // `sort_by` is stable, which gives the first-appearance tie-break.
    groups.sort_by(|a, b| b.1.total_cmp(&a.1));
    groups.truncate(n);

    groups
        .into_iter()
        .map(|(keys, value)| RankedGroup {
            keys: keys.into_iter().map(str::to_string).collect(),
            value,
        })
        .collect()
}

/// Highest-spending customers.
pub fn top_customers<R: Borrow<SubscriptionRecord>>(records: &[R], n: usize) -> Vec<CustomerSpend> {
    top_n(
        records,
        n,
        &[Dimension::CustomerId, Dimension::CustomerName],
        Metric::TotalPrice,
    )
    .into_iter()
    .map(|group| {
        let mut keys = group.keys.into_iter();
        CustomerSpend {
            customer_id: keys.next().unwrap_or_default(),
            customer_name: keys.next().unwrap_or_default(),
            total_spend: group.value,
        }
    })
    .collect()
}

/// Most frequent plan type + meal frequency pairs.
pub fn top_combinations<R: Borrow<SubscriptionRecord>>(records: &[R], n: usize) -> Vec<PlanCombination> {
    top_n(
        records,
        n,
        &[Dimension::PlanType, Dimension::MealFrequency],
        Metric::Count,
    )
    .into_iter()
    .map(|group| {
        let mut keys = group.keys.into_iter();
        PlanCombination {
            plan_type: keys.next().unwrap_or_default(),
            meal_frequency: keys.next().unwrap_or_default(),
            count: group.value as usize,
        }
    })
    .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
