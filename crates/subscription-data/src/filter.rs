//! Conjunctive multi-dimensional filtering.

use std::borrow::Borrow;

use subscription_core::error::Result;
use subscription_core::models::{FilterCriteria, SubscriptionRecord};
use tracing::debug;

use crate::as_record;

/// Return the records satisfying `criteria`, in input order.
///
/// Pure and order-preserving: the output is a subsequence of `records`.
/// Empty input yields empty output. Fails only with
/// [`DashboardError::InvalidCriteria`](subscription_core::DashboardError::InvalidCriteria)
/// when the criteria themselves are malformed.
pub fn apply<'a, R>(records: &'a [R], criteria: &FilterCriteria) -> Result<Vec<&'a SubscriptionRecord>>
where
    R: Borrow<SubscriptionRecord>,
{
    criteria.validate()?;

    let filtered: Vec<&SubscriptionRecord> = records
        .iter()
        .map(as_record)
        .filter(|r| criteria.matches(r))
        .collect();

    debug!("filter kept {} of {} records", filtered.len(), records.len());
    Ok(filtered)
}
