//! CSV discovery, schema validation and record normalisation.
//!
//! Turns raw tabular input into a [`Dataset`] of typed
//! [`SubscriptionRecord`]s. Headers are canonicalised before matching, every
//! required column must be present, and cells are parsed into strong types at
//! this boundary so nothing downstream ever sees a raw string value.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use subscription_core::data_processors::{
    DateProcessor, HeaderNormalizer, NumberProcessor, REQUIRED_COLUMNS,
};
use subscription_core::error::{DashboardError, Result};
use subscription_core::models::{InvalidRowPolicy, SubscriptionRecord};
use tracing::{debug, warn};

use crate::dataset::{Dataset, LoadReport, RowIssue};

// ── RecordNormalizer ──────────────────────────────────────────────────────────

/// Column positions of the required fields within one input's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNormalizer {
    /// Indexed in [`REQUIRED_COLUMNS`] order.
    positions: [usize; REQUIRED_COLUMNS.len()],
}

impl RecordNormalizer {
    /// Resolve the required columns against `headers`.
    ///
    /// Fails with [`DashboardError::Schema`] listing every missing column.
    pub fn from_headers<I, S>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| HeaderNormalizer::canonical(h.as_ref()))
            .collect();

        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| h.eq_ignore_ascii_case(column)) {
                Some(pos) => positions[slot] = pos,
                None => missing.push(column.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(DashboardError::Schema { missing });
        }
        Ok(Self { positions })
    }

    /// Convert one data row. `row_number` is 1-based and only used for
    /// error reporting.
    pub fn normalize_row(&self, row: &StringRecord, row_number: usize) -> Result<SubscriptionRecord> {
        let [id, name, plan, meal, start, duration, price] = self.positions;
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();

        let customer_id = cell(id);
        if customer_id.is_empty() {
            return Err(DashboardError::parse(
                row_number,
                REQUIRED_COLUMNS[0],
                customer_id,
                "customer id is empty",
            ));
        }

        for (idx, column) in [(plan, REQUIRED_COLUMNS[2]), (meal, REQUIRED_COLUMNS[3])] {
            if cell(idx).is_empty() {
                return Err(DashboardError::parse(row_number, column, "", "value is empty"));
            }
        }

        let start_raw = cell(start);
        let start_date = DateProcessor::parse(start_raw).ok_or_else(|| {
            DashboardError::parse(row_number, REQUIRED_COLUMNS[4], start_raw, "not a calendar date")
        })?;

        let duration_raw = cell(duration);
        let duration_days = NumberProcessor::parse_days(duration_raw)
            .map_err(|reason| DashboardError::parse(row_number, REQUIRED_COLUMNS[5], duration_raw, reason))?;

        let price_raw = cell(price);
        let total_price = NumberProcessor::parse_price(price_raw)
            .map_err(|reason| DashboardError::parse(row_number, REQUIRED_COLUMNS[6], price_raw, reason))?;

        Ok(SubscriptionRecord::new(
            customer_id,
            cell(name),
            cell(plan),
            cell(meal),
            start_date,
            duration_days,
            total_price,
        ))
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load a dataset from a CSV file or from every CSV file under a directory.
///
/// Directory inputs are concatenated in path order; each file is validated
/// against the schema independently.
pub fn load_dataset(path: &Path, policy: InvalidRowPolicy) -> Result<Dataset> {
    if !path.exists() {
        return Err(DashboardError::DataPathNotFound(path.to_path_buf()));
    }

    let files = if path.is_dir() {
        let files = find_csv_files(path);
        if files.is_empty() {
            return Err(DashboardError::NoDataFiles(path.to_path_buf()));
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for file_path in &files {
        let file = File::open(file_path).map_err(|source| DashboardError::FileRead {
            path: file_path.clone(),
            source,
        })?;
        let before = records.len();
        read_into(file, policy, Some(file_path), &mut records, &mut report)?;
        report.files.push(file_path.clone());
        debug!(
            "File {}: {} records normalised",
            file_path.display(),
            records.len() - before
        );
    }

    debug!(
        "Loaded {} records from {} file(s), {} row(s) skipped",
        records.len(),
        files.len(),
        report.skipped.len()
    );

    Ok(Dataset::with_report(records, report))
}

/// Load a dataset from any CSV byte source (e.g. an uploaded file held in
/// memory).
pub fn read_dataset<R: Read>(reader: R, policy: InvalidRowPolicy) -> Result<Dataset> {
    let mut report = LoadReport::default();
    let mut records = Vec::new();
    read_into(reader, policy, None, &mut records, &mut report)?;
    Ok(Dataset::with_report(records, report))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_into<R: Read>(
    reader: R,
    policy: InvalidRowPolicy,
    source: Option<&Path>,
    records: &mut Vec<SubscriptionRecord>,
    report: &mut LoadReport,
) -> Result<()> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let normalizer = RecordNormalizer::from_headers(csv_reader.headers()?.iter())?;

    for (idx, row) in csv_reader.records().enumerate() {
        let row_number = idx + 1;
        let row = match row {
            Ok(row) => row,
            Err(err) if policy == InvalidRowPolicy::Skip => {
                let row_number = err
                    .position()
                    .map_or(row_number, |pos| pos.record() as usize);
                report.rows_read += 1;
                skip_row(report, source, row_number, &err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        report.rows_read += 1;

        match normalizer.normalize_row(&row, row_number) {
            Ok(record) => records.push(record),
            Err(err) if policy == InvalidRowPolicy::Skip => skip_row(report, source, row_number, &err),
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

fn skip_row(report: &mut LoadReport, source: Option<&Path>, row_number: usize, err: &dyn std::fmt::Display) {
    warn!(
        "Skipping row {} of {}: {}",
        row_number,
        source.map(|p| p.display().to_string()).unwrap_or_else(|| "<input>".to_string()),
        err
    );
    report.skipped.push(RowIssue {
        file: source.map(Path::to_path_buf),
        row: row_number,
        message: err.to_string(),
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const HEADER: &str = "Customer_ID,Customer_Name,Plan_Type,Meal_Frequency,Start_Date,Duration_Days,Total_Price";

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    // ── RecordNormalizer ──────────────────────────────────────────────────────

    #[test]
    fn test_headers_are_canonicalised() {
        let headers = [
            " Total Price",
            "customer id",
            "Customer  Name",
            "PLAN TYPE",
            "Meal Frequency ",
            "Start Date",
            "Duration Days",
            "Notes",
        ];
        let normalizer = RecordNormalizer::from_headers(headers).unwrap();
        assert_eq!(normalizer.positions, [1, 2, 3, 4, 5, 6, 0]);
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let err = RecordNormalizer::from_headers(["Customer_ID", "Customer_Name", "Plan_Type"])
            .unwrap_err();
        match err {
            DashboardError::Schema { missing } => assert_eq!(
                missing,
                vec!["Meal_Frequency", "Start_Date", "Duration_Days", "Total_Price"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_row_types_and_month() {
        let normalizer = RecordNormalizer::from_headers(HEADER.split(',')).unwrap();
        let row = StringRecord::from(vec![" C-1 ", "Asha", "Veg", "Lunch", "2024-02-10", "20", "1,300"]);
        let record = normalizer.normalize_row(&row, 1).unwrap();

        assert_eq!(record.customer_id(), "C-1");
        assert_eq!(record.start_date(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(record.month(), "2024-02");
        assert_eq!(record.duration_days(), 20);
        assert_eq!(record.total_price(), 1300.0);
    }

    #[test]
    fn test_normalize_row_bad_date_is_parse_error() {
        let normalizer = RecordNormalizer::from_headers(HEADER.split(',')).unwrap();
        let row = StringRecord::from(vec!["C-1", "Asha", "Veg", "Lunch", "2024-02-31", "20", "100"]);
        match normalizer.normalize_row(&row, 7).unwrap_err() {
            DashboardError::Parse { row, column, .. } => {
                assert_eq!(row, 7);
                assert_eq!(column, "Start_Date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_row_short_row_is_parse_error() {
        let normalizer = RecordNormalizer::from_headers(HEADER.split(',')).unwrap();
        let row = StringRecord::from(vec!["C-1", "Asha", "Veg"]);
        assert!(matches!(
            normalizer.normalize_row(&row, 1),
            Err(DashboardError::Parse { .. })
        ));
    }

    #[test]
    fn test_normalize_row_empty_customer_id() {
        let normalizer = RecordNormalizer::from_headers(HEADER.split(',')).unwrap();
        let row = StringRecord::from(vec!["  ", "Asha", "Veg", "Lunch", "2024-02-01", "20", "100"]);
        assert!(matches!(
            normalizer.normalize_row(&row, 1),
            Err(DashboardError::Parse { .. })
        ));
    }

    // ── read_dataset ──────────────────────────────────────────────────────────

    #[test]
    fn test_read_dataset_preserves_order() {
        let input = format!(
            "{HEADER}\nB,Bala,Keto,Dinner,2024-01-20,10,200\nA,Asha,Veg,Lunch,2024-01-05,5,100\n"
        );
        let ds = read_dataset(input.as_bytes(), InvalidRowPolicy::Reject).unwrap();
        let ids: Vec<&str> = ds.records().iter().map(|r| r.customer_id()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(ds.report().rows_read, 2);
    }

    #[test]
    fn test_read_dataset_reject_policy_fails_batch() {
        let input = format!(
            "{HEADER}\nA,Asha,Veg,Lunch,2024-01-05,5,100\nB,Bala,Keto,Dinner,yesterday,10,200\n"
        );
        let err = read_dataset(input.as_bytes(), InvalidRowPolicy::Reject).unwrap_err();
        assert!(matches!(err, DashboardError::Parse { row: 2, .. }));
    }

    #[test]
    fn test_read_dataset_skip_policy_reports_row() {
        let input = format!(
            "{HEADER}\nA,Asha,Veg,Lunch,2024-01-05,5,100\nB,Bala,Keto,Dinner,yesterday,10,200\n"
        );
        let ds = read_dataset(input.as_bytes(), InvalidRowPolicy::Skip).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.report().rows_read, 2);
        assert_eq!(ds.report().skipped.len(), 1);
        assert_eq!(ds.report().skipped[0].row, 2);
        assert!(ds.report().skipped[0].file.is_none());
    }

    #[test]
    fn test_read_dataset_skip_policy_drops_undecodable_row() {
        let mut input = format!("{HEADER}\nA,Asha,Veg,Lunch,2024-01-05,5,100\nB,").into_bytes();
        input.extend_from_slice(b"\xff\xfe,Keto,Dinner,2024-01-06,10,200\n");
        input.extend_from_slice(b"C,Chitra,Veg,Dinner,2024-01-07,7,150\n");

        let ds = read_dataset(input.as_slice(), InvalidRowPolicy::Skip).unwrap();
        let ids: Vec<&str> = ds.records().iter().map(|r| r.customer_id()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(ds.report().rows_read, 3);
        assert_eq!(ds.report().skipped.len(), 1);
        assert_eq!(ds.report().skipped[0].row, 2);
    }

    #[test]
    fn test_read_dataset_reject_policy_fails_on_undecodable_row() {
        let mut input = format!("{HEADER}\nB,").into_bytes();
        input.extend_from_slice(b"\xff\xfe,Keto,Dinner,2024-01-06,10,200\n");
        let err = read_dataset(input.as_slice(), InvalidRowPolicy::Reject).unwrap_err();
        assert!(matches!(err, DashboardError::Csv(_)));
    }

    #[test]
    fn test_normalize_row_rejects_short_row_missing_plan_and_meal() {
        let input = format!("{HEADER}\nA,Asha\n");
        let err = read_dataset(input.as_bytes(), InvalidRowPolicy::Reject).unwrap_err();
        match err {
            DashboardError::Parse { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Plan_Type");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_read_dataset_skip_policy_drops_empty_meal_frequency() {
        let input = format!(
            "{HEADER}\nA,Asha,Veg,Lunch,2024-01-05,5,100\nB,Bala,Keto, ,2024-01-06,10,200\n"
        );
        let ds = read_dataset(input.as_bytes(), InvalidRowPolicy::Skip).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.meal_frequencies(), vec!["Lunch"]);
        assert!(ds.report().skipped[0].message.contains("Meal_Frequency"));
    }

    #[test]
    fn test_read_dataset_schema_error_even_when_skipping() {
        let input = "Customer_ID,Plan_Type\nA,Veg\n";
        let err = read_dataset(input.as_bytes(), InvalidRowPolicy::Skip).unwrap_err();
        assert!(matches!(err, DashboardError::Schema { .. }));
    }

    #[test]
    fn test_read_dataset_header_only_is_empty() {
        let ds = read_dataset(HEADER.as_bytes(), InvalidRowPolicy::Reject).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn test_read_dataset_ignores_blank_rows() {
        let input = format!("{HEADER}\nA,Asha,Veg,Lunch,2024-01-05,5,100\n,,,,,,\n");
        let ds = read_dataset(input.as_bytes(), InvalidRowPolicy::Reject).unwrap();
        assert_eq!(ds.len(), 1);
    }

    // ── find_csv_files / load_dataset ─────────────────────────────────────────

    #[test]
    fn test_find_csv_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("2024");
        std::fs::create_dir_all(&sub).unwrap();
        write_csv(dir.path(), "b.csv", &[HEADER]);
        write_csv(dir.path(), "a.CSV", &[HEADER]);
        write_csv(&sub, "c.csv", &[HEADER]);
        write_csv(dir.path(), "notes.txt", &["ignore me"]);

        let files = find_csv_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["c.csv", "a.CSV", "b.csv"]);
    }

    #[test]
    fn test_load_dataset_directory_concatenates() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "jan.csv", &[HEADER, "A,Asha,Veg,Lunch,2024-01-05,5,100"]);
        write_csv(
            dir.path(),
            "feb.csv",
            &[HEADER, "A,Asha,Veg,Lunch,2024-02-10,20,300"],
        );

        let ds = load_dataset(dir.path(), InvalidRowPolicy::Reject).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.report().files.len(), 2);
        // feb.csv sorts before jan.csv.
        assert_eq!(ds.records()[0].month(), "2024-02");
    }

    #[test]
    fn test_load_dataset_skip_records_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "data.csv",
            &[HEADER, "A,Asha,Veg,Lunch,2024-01-05,-5,100"],
        );
        let ds = load_dataset(&path, InvalidRowPolicy::Skip).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.report().skipped[0].file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_dataset_missing_path() {
        let err = load_dataset(
            Path::new("/tmp/does-not-exist-subscription-test-xyz.csv"),
            InvalidRowPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, DashboardError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_dataset_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = load_dataset(dir.path(), InvalidRowPolicy::Reject).unwrap_err();
        assert!(matches!(err, DashboardError::NoDataFiles(_)));
    }
}
