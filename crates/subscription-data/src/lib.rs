//! Aggregation engine for subscription analytics.
//!
//! Responsible for normalising CSV input into typed records, filtering them,
//! and computing the derived views (KPIs, monthly series, frequencies,
//! duration buckets, cohorts, rankings and cross-tabs) that drive the
//! dashboard.
//!
//! Every view function is a pure reduction over a record slice. The slices
//! are generic over [`Borrow<SubscriptionRecord>`](std::borrow::Borrow) so the
//! same function accepts the full dataset (`&[SubscriptionRecord]`) and a
//! filtered selection (`&[&SubscriptionRecord]`).

pub mod aggregator;
pub mod analysis;
pub mod cohort;
pub mod crosstab;
pub mod dataset;
pub mod export;
pub mod filter;
pub mod ranking;
pub mod reader;

pub use dataset::Dataset;
pub use subscription_core as core;

use std::borrow::Borrow;

use subscription_core::models::SubscriptionRecord;

pub(crate) fn as_record<R: Borrow<SubscriptionRecord>>(r: &R) -> &SubscriptionRecord {
    r.borrow()
}
