//! Usage-history CSV ingest.
//!
//! Expected schema (header row required, extra columns ignored):
//!
//! ```text
//! date,usage_gb
//! 2024-01-01,3.2
//! 2024-01-02,0.0
//! ```
//!
//! Unlike the plan catalog, a malformed row here is fatal: the series is
//! ordered and a silently dropped day would shift every weekday assignment
//! after it.

use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{UsageHistory, UsageSample};
use crate::error::AppError;

pub fn load_usage_csv(path: &Path) -> Result<UsageHistory, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open usage CSV '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read usage CSV headers: {e}")))?
        .clone();
    let date_col = find_column(&headers, "date")?;
    let usage_col = find_column(&headers, "usage_gb")?;

    let mut samples = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1; data starts at line 2.
        let line = idx + 2;
        let record = record.map_err(|e| AppError::new(2, format!("Usage CSV line {line}: {e}")))?;

        let date = field(&record, date_col, line, "date")?
            .parse::<NaiveDate>()
            .map_err(|e| AppError::new(2, format!("Usage CSV line {line}: invalid date: {e}")))?;
        let gb = field(&record, usage_col, line, "usage_gb")?
            .parse::<f64>()
            .map_err(|e| AppError::new(2, format!("Usage CSV line {line}: invalid usage: {e}")))?;

        samples.push(UsageSample { date, gb });
    }

    UsageHistory::new(samples)
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, AppError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| AppError::new(2, format!("Usage CSV is missing the '{name}' column.")))
}

fn field<'a>(record: &'a StringRecord, col: usize, line: usize, name: &str) -> Result<&'a str, AppError> {
    record
        .get(col)
        .ok_or_else(|| AppError::new(2, format!("Usage CSV line {line}: missing '{name}' field.")))
}
