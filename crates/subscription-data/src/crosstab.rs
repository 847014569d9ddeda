//! Two-dimensional count / sum matrices.
//!
//! The row and column label sets are the labels observed in the input, so a
//! narrower filter can shrink the matrix. Within those sets the matrix is
//! dense: a combination with no records is an explicit `0`.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use subscription_core::models::{Dimension, Metric, SubscriptionRecord};

use crate::as_record;

/// What each cell accumulates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAggregate {
    #[default]
    Count,
    Sum(Metric),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_field: Dimension,
    pub col_field: Dimension,
    pub aggregate: CellAggregate,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[r][c]` for `rows[r]` × `columns[c]`.
    pub cells: Vec<Vec<f64>>,
}

impl CrossTab {
    /// Value at (`row`, `col`), or `None` when either label is not in the
    /// matrix.
    pub fn cell(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.rows.iter().position(|l| l == row)?;
        let c = self.columns.iter().position(|l| l == col)?;
        Some(self.cells[r][c])
    }

    pub fn row_totals(&self) -> Vec<f64> {
        self.cells.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<f64> {
        (0..self.columns.len())
            .map(|c| self.cells.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.row_totals().iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the `row_field` × `col_field` matrix of `aggregate` over `records`.
///
/// Labels are ordered ascending in each dimension's natural order.
pub fn crosstab<R: Borrow<SubscriptionRecord>>(
    records: &[R],
    row_field: Dimension,
    col_field: Dimension,
    aggregate: CellAggregate,
) -> CrossTab {
    let mut row_labels: HashSet<&str> = HashSet::new();
    let mut col_labels: HashSet<&str> = HashSet::new();
    let mut sums: HashMap<(&str, &str), f64> = HashMap::new();

    for record in records.iter().map(as_record) {
        let row = record.dimension(row_field);
        let col = record.dimension(col_field);
        row_labels.insert(row);
        col_labels.insert(col);
        let contribution = match aggregate {
            CellAggregate::Count => 1.0,
            CellAggregate::Sum(metric) => record.metric(metric),
        };
        *sums.entry((row, col)).or_default() += contribution;
    }

    let mut rows: Vec<String> = row_labels.into_iter().map(str::to_string).collect();
    let mut columns: Vec<String> = col_labels.into_iter().map(str::to_string).collect();
    row_field.sort_labels(&mut rows);
    col_field.sort_labels(&mut columns);

    let cells = rows
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| sums.get(&(r.as_str(), c.as_str())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    CrossTab {
        row_field,
        col_field,
        aggregate,
        rows,
        columns,
        cells,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
