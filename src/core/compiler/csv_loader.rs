//! Delimited text loading for batch files

use super::row::RawRow;
use crate::domain::errors::StudyhubError;
use crate::domain::report::ValidationReport;
use crate::domain::Result;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default field delimiter of batch files
pub const DEFAULT_DELIMITER: u8 = b';';

/// Read a delimited file with a header row into raw rows
///
/// The header is line 1, so the first data row is line 2. Records spanning
/// several physical lines keep the line they start on.
///
/// # Errors
///
/// Returns [`StudyhubError::BatchFormat`] when the content can't be read as
/// delimited text (e.g. invalid UTF-8).
///
/// # Examples
///
/// ```
/// use studyhub::core::compiler::load_csv;
///
/// let data = "PatientID;StudyInstanceUID\n1001;1.2.3\n";
/// let rows = load_csv(data.as_bytes(), b';').unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].line, 2);
/// assert_eq!(rows[0].get("StudyInstanceUID"), "1.2.3");
/// ```
pub fn load_csv<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let values: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();

        rows.push(RawRow::new(line, values));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "Batch file loaded");
    Ok(rows)
}

/// Open and read a batch file from disk
pub fn load_csv_file(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        StudyhubError::Io(format!("Failed to open batch file {}: {}", path.display(), e))
    })?;
    load_csv(file, delimiter)
}

fn csv_error(err: csv::Error) -> StudyhubError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(1);
    let mut report = ValidationReport::new();
    report.add_row_error(line, format!("Unreadable batch file: {err}"));
    StudyhubError::BatchFormat(report)
}
