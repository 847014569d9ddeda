//! Pass-through CSV export of a (typically filtered) record selection.

use std::borrow::Borrow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use subscription_core::data_processors::REQUIRED_COLUMNS;
use subscription_core::error::Result;
use subscription_core::models::SubscriptionRecord;
use tracing::debug;

use crate::as_record;

/// Write `records` as CSV with the canonical headers plus `Month`.
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write, R: Borrow<SubscriptionRecord>>(writer: W, records: &[R]) -> Result<usize> {
    let mut out = WriterBuilder::new().from_writer(writer);

    out.write_record(REQUIRED_COLUMNS.iter().copied().chain(std::iter::once("Month")))?;
    for record in records.iter().map(as_record) {
        let start_date = record.start_date().format("%Y-%m-%d").to_string();
        let duration = record.duration_days().to_string();
        let price = record.total_price().to_string();
        out.write_record([
            record.customer_id(),
            record.customer_name(),
            record.plan_type(),
            record.meal_frequency(),
            start_date.as_str(),
            duration.as_str(),
            price.as_str(),
            record.month(),
        ])?;
    }
    out.flush()?;

    Ok(records.len())
}

/// Write `records` to a CSV file at `path`, replacing any existing file.
pub fn export_csv<R: Borrow<SubscriptionRecord>>(path: &Path, records: &[R]) -> Result<usize> {
    let file = File::create(path)?;
    let written = write_csv(file, records)?;
    debug!("exported {} records to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_dataset;
    use chrono::NaiveDate;
    use subscription_core::models::InvalidRowPolicy;
    use tempfile::TempDir;

    fn sample() -> Vec<SubscriptionRecord> {
        vec![
            SubscriptionRecord::new(
                "A",
                "Asha, R.",
                "Veg",
                "Lunch",
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                5,
                100.0,
            ),
            SubscriptionRecord::new(
                "B",
                "Bala",
                "Keto",
                "Dinner",
                NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                20,
                1499.5,
            ),
        ]
    }

    #[test]
    fn test_write_csv_layout() {
        let mut buf = Vec::new();
        let n = write_csv(&mut buf, &sample()).unwrap();
        assert_eq!(n, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Customer_ID,Customer_Name,Plan_Type,Meal_Frequency,Start_Date,Duration_Days,Total_Price,Month"
        );
        assert_eq!(lines[1], "A,\"Asha, R.\",Veg,Lunch,2024-01-05,5,100,2024-01");
        assert_eq!(lines[2], "B,Bala,Keto,Dinner,2024-02-10,20,1499.5,2024-02");
    }

    #[test]
    fn test_exported_file_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filtered.csv");
        let records = sample();
        let selection: Vec<&SubscriptionRecord> = records.iter().skip(1).collect();

        export_csv(&path, &selection).unwrap();

        let file = File::open(&path).unwrap();
        let ds = read_dataset(file, InvalidRowPolicy::Reject).unwrap();
        assert_eq!(ds.records(), &records[1..]);
    }

    #[test]
    fn test_write_csv_empty_selection_has_header() {
        let mut buf = Vec::new();
        let empty: Vec<SubscriptionRecord> = Vec::new();
        assert_eq!(write_csv(&mut buf, &empty).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
