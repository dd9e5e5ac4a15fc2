use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{GradeError, Result};
use crate::models::{GradeRecord, Table, Value, REQUIRED_COLUMNS};

/// Reads a delimited grade source into a [`Table`].
///
/// Every required header must be present before any row is read. Columns
/// keep their source order; extra columns pass through untouched.
pub fn load_csv<R: Read>(source: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(source);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(GradeError::schema(column));
        }
    }
    debug!(columns = headers.len(), "Grade headers validated");

    let mut table = Table::new(headers);
    for result in reader.records() {
        let record = result?;
        table.push_row(record.iter().map(Value::from_cell).collect());
    }

    Ok(table)
}

pub fn load_path(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let table = load_csv(file)?;
    info!(path = %path.display(), rows = table.len(), "Grade records loaded");
    Ok(table)
}

pub fn load_records(records: &[GradeRecord]) -> Table {
    Table::from_records(records)
}

/// Reads typed [`GradeRecord`]s, ignoring any extra columns.
///
/// A missing or non-numeric exam fails the read.
pub fn read_records<R: Read>(source: R) -> Result<Vec<GradeRecord>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(GradeError::schema(column));
        }
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<GradeRecord>() {
        records.push(result?);
    }
    Ok(records)
}
