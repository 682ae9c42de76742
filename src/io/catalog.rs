//! Plan-catalog CSV ingest.
//!
//! Expected schema (header row required):
//!
//! ```text
//! name,description,quota_gb,overage_per_gb,price
//! Basic,2GB starter plan,2,10.0,15
//! Max,Everything,unlimited,0,80
//! ```
//!
//! `unlimited` (case-insensitive) in the quota column maps to an infinite
//! quota. Rows are validated individually: a malformed row is skipped and
//! reported, not fatal — catalog entries are independent of each other.

use std::path::Path;

use csv::StringRecord;

use crate::domain::{CatalogPlan, PlanTerms};
use crate::error::AppError;

/// A row-level problem encountered during catalog ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub name: Option<String>,
    pub message: String,
}

/// Ingest output: usable plans plus whatever was skipped.
#[derive(Debug, Clone)]
pub struct CatalogData {
    pub plans: Vec<CatalogPlan>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_catalog_csv(path: &Path) -> Result<CatalogData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open catalog CSV '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read catalog CSV headers: {e}")))?
        .clone();
    let cols = Columns::resolve(&headers)?;

    let mut plans = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    name: None,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match parse_row(&record, &cols) {
            Ok(plan) => plans.push(plan),
            Err(message) => row_errors.push(RowError {
                line,
                name: record.get(cols.name).map(str::to_string),
                message,
            }),
        }
    }

    Ok(CatalogData {
        plans,
        row_errors,
        rows_read,
    })
}

struct Columns {
    name: usize,
    description: usize,
    quota: usize,
    overage: usize,
    price: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| AppError::new(2, format!("Catalog CSV is missing the '{name}' column.")))
        };
        Ok(Self {
            name: find("name")?,
            description: find("description")?,
            quota: find("quota_gb")?,
            overage: find("overage_per_gb")?,
            price: find("price")?,
        })
    }
}

fn parse_row(record: &StringRecord, cols: &Columns) -> Result<CatalogPlan, String> {
    let field = |col: usize, name: &str| {
        record
            .get(col)
            .ok_or_else(|| format!("missing '{name}' field"))
    };

    let name = field(cols.name, "name")?.to_string();
    if name.is_empty() {
        return Err("plan name is empty".to_string());
    }
    let description = field(cols.description, "description")?.to_string();

    let quota_raw = field(cols.quota, "quota_gb")?;
    let quota = if quota_raw.eq_ignore_ascii_case("unlimited") {
        f64::INFINITY
    } else {
        quota_raw
            .parse::<f64>()
            .map_err(|e| format!("invalid quota: {e}"))?
    };
    let overage = field(cols.overage, "overage_per_gb")?
        .parse::<f64>()
        .map_err(|e| format!("invalid overage rate: {e}"))?;
    let price = field(cols.price, "price")?
        .parse::<f64>()
        .map_err(|e| format!("invalid price: {e}"))?;

    let terms = PlanTerms { quota, overage, price };
    terms.validate().map_err(|e| e.to_string())?;

    Ok(CatalogPlan {
        name,
        description,
        terms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_plans_and_maps_unlimited_to_infinity() {
        let file = write_csv(
            "name,description,quota_gb,overage_per_gb,price\n\
             Basic,2GB starter,2,10.0,15\n\
             Max,Everything,unlimited,0,80\n",
        );
        let catalog = load_catalog_csv(file.path()).unwrap();

        assert_eq!(catalog.rows_read, 2);
        assert!(catalog.row_errors.is_empty());
        assert_eq!(catalog.plans.len(), 2);
        assert_eq!(catalog.plans[0].name, "Basic");
        assert_eq!(catalog.plans[0].terms.quota, 2.0);
        assert!(catalog.plans[1].terms.is_unlimited());
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let file = write_csv(
            "name,description,quota_gb,overage_per_gb,price\n\
             Basic,ok,2,10.0,15\n\
             Broken,negative quota,-3,0.0,20\n\
             AlsoBroken,bad number,five,0.0,20\n\
             Fine,ok,10,0.5,30\n",
        );
        let catalog = load_catalog_csv(file.path()).unwrap();

        assert_eq!(catalog.rows_read, 4);
        assert_eq!(catalog.plans.len(), 2);
        assert_eq!(catalog.row_errors.len(), 2);
        assert_eq!(catalog.row_errors[0].line, 3);
        assert_eq!(catalog.row_errors[0].name.as_deref(), Some("Broken"));
    }

    #[test]
    fn missing_column_is_fatal() {
        let file = write_csv("name,quota_gb,overage_per_gb,price\nBasic,2,10.0,15\n");
        assert!(load_catalog_csv(file.path()).is_err());
    }
}
