//! Shared types for the subscription dashboard.
//!
//! Typed subscription records, grouping dimensions and metrics, filter
//! criteria, the error taxonomy, cell parsers, number formatting and the CLI
//! settings layer.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{DashboardError, Result};
pub use models::{
    DurationCategory, Dimension, FilterCriteria, InvalidRowPolicy, Metric, SubscriptionRecord,
};
