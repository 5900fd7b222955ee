//! Raw batch rows and per-field cleaning

use super::mapping::{Field, FieldMapping};
use crate::domain::errors::StudyhubError;
use crate::domain::ids::{validate_uid, SeriesUid, StudyUid};
use crate::domain::report::ValidationReport;
use crate::domain::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const MAX_PATIENT_ID_LENGTH: usize = 64;
pub const MAX_PATIENT_NAME_LENGTH: usize = 324;
pub const MAX_ACCESSION_NUMBER_LENGTH: usize = 16;
pub const MAX_MODALITY_LENGTH: usize = 16;
pub const MAX_PSEUDONYM_LENGTH: usize = 64;

/// One record of a batch file before validation
///
/// Values are keyed by column header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line: usize,
    pub values: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: usize, values: HashMap<String, String>) -> Self {
        Self { line, values }
    }

    /// Build a row from `(column, value)` pairs
    ///
    /// # Examples
    ///
    /// ```
    /// use studyhub::core::compiler::RawRow;
    ///
    /// let row = RawRow::from_pairs(2, &[("PatientID", "1001"), ("Modality", "CT")]);
    /// assert_eq!(row.get("PatientID"), "1001");
    /// assert_eq!(row.get("Missing"), "");
    /// ```
    pub fn from_pairs(line: usize, pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { line, values }
    }

    /// Value of a column, empty when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// A cleaned, individually validated transfer request
///
/// Built from one [`RawRow`]; never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub line: usize,
    pub row_key: String,
    pub patient_id: String,
    /// Normalized to `Last^First`
    pub patient_name: String,
    pub patient_birth_date: Option<NaiveDate>,
    pub accession_number: String,
    pub study_date: Option<NaiveDate>,
    pub study_date_start: Option<NaiveDate>,
    pub study_date_end: Option<NaiveDate>,
    pub modality: String,
    pub pseudonym: String,
    pub study_uid: Option<StudyUid>,
    pub series_uid: Option<SeriesUid>,
    pub series_number: Option<i32>,
}

impl RequestRow {
    /// Text that identifies the patient of this row
    pub fn patient_descriptor(&self) -> String {
        let birth_date = self
            .patient_birth_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        format!("{}_{}_{}", self.patient_id, self.patient_name, birth_date)
    }
}

/// Cleans and validates the fields of single rows
///
/// Holds the state that spans rows for per-field checks (row key uniqueness).
pub struct RowCleaner<'a> {
    mapping: &'a FieldMapping,
    date_formats: &'a [String],
    name_separator: Regex,
    row_keys: HashSet<u64>,
}

impl<'a> RowCleaner<'a> {
    pub fn new(mapping: &'a FieldMapping, date_formats: &'a [String]) -> Result<Self> {
        let name_separator = Regex::new(r"\s*,\s*")
            .map_err(|e| StudyhubError::Other(format!("Invalid name separator pattern: {e}")))?;
        Ok(Self {
            mapping,
            date_formats,
            name_separator,
            row_keys: HashSet::new(),
        })
    }

    /// Trimmed value of a mapped field, empty for unmapped fields
    pub fn value<'r>(&self, raw: &'r RawRow, field: Field) -> &'r str {
        match self.mapping.column(field) {
            Some(column) => raw.get(column).trim(),
            None => "",
        }
    }

    /// Whether every mapped field of the row is empty
    pub fn is_blank(&self, raw: &RawRow) -> bool {
        self.mapping
            .fields()
            .all(|(_, column)| raw.get(column).trim().is_empty())
    }

    /// Clean all fields of `raw`, recording problems in `report`
    pub fn clean(&mut self, raw: &RawRow, report: &mut ValidationReport) -> RequestRow {
        let line = raw.line;
        let mut errors = FieldErrors {
            report,
            mapping: self.mapping,
            line,
        };

        let row_key = self.clean_row_key(self.value(raw, Field::RowKey), &mut errors);

        let patient_id = self.value(raw, Field::PatientId).to_string();
        check_length(&patient_id, MAX_PATIENT_ID_LENGTH, Field::PatientId, &mut errors);
        check_no_backslash(&patient_id, Field::PatientId, &mut errors);
        check_no_control_chars(&patient_id, Field::PatientId, &mut errors);
        check_no_wildcards(&patient_id, Field::PatientId, &mut errors);

        let patient_name = self.normalize_name(self.value(raw, Field::PatientName));
        check_length(&patient_name, MAX_PATIENT_NAME_LENGTH, Field::PatientName, &mut errors);

        let patient_birth_date = self.clean_date(
            self.value(raw, Field::PatientBirthDate),
            Field::PatientBirthDate,
            &mut errors,
        );

        let accession_number = self.value(raw, Field::AccessionNumber).to_string();
        check_length(
            &accession_number,
            MAX_ACCESSION_NUMBER_LENGTH,
            Field::AccessionNumber,
            &mut errors,
        );

        let study_date =
            self.clean_date(self.value(raw, Field::StudyDate), Field::StudyDate, &mut errors);
        let study_date_start = self.clean_date(
            self.value(raw, Field::StudyDateStart),
            Field::StudyDateStart,
            &mut errors,
        );
        let study_date_end = self.clean_date(
            self.value(raw, Field::StudyDateEnd),
            Field::StudyDateEnd,
            &mut errors,
        );
        if let (Some(start), Some(end)) = (study_date_start, study_date_end) {
            if start > end {
                errors.add(Field::StudyDateStart, "Must not be after StudyDateEnd.");
            }
        }

        let modality = self.value(raw, Field::Modality).to_string();
        check_length(&modality, MAX_MODALITY_LENGTH, Field::Modality, &mut errors);

        let pseudonym = self.normalize_name(self.value(raw, Field::Pseudonym));
        check_length(&pseudonym, MAX_PSEUDONYM_LENGTH, Field::Pseudonym, &mut errors);
        check_no_backslash(&pseudonym, Field::Pseudonym, &mut errors);
        check_no_control_chars(&pseudonym, Field::Pseudonym, &mut errors);

        let study_uid = clean_uid(self.value(raw, Field::StudyUid), Field::StudyUid, &mut errors)
            .and_then(|uid| StudyUid::new(uid).ok());
        let series_uid = clean_uid(self.value(raw, Field::SeriesUid), Field::SeriesUid, &mut errors)
            .and_then(|uid| SeriesUid::new(uid).ok());

        let series_number = clean_series_number(self.value(raw, Field::SeriesNumber), &mut errors);

        RequestRow {
            line,
            row_key,
            patient_id,
            patient_name,
            patient_birth_date,
            accession_number,
            study_date,
            study_date_start,
            study_date_end,
            modality,
            pseudonym,
            study_uid,
            series_uid,
            series_number,
        }
    }

    fn clean_row_key(&mut self, row_key: &str, errors: &mut FieldErrors<'_>) -> String {
        if !self.mapping.is_mapped(Field::RowKey) {
            return String::new();
        }

        if row_key.is_empty() {
            errors.add(Field::RowKey, "Missing value.");
        } else if !row_key.chars().all(|c| c.is_ascii_digit()) {
            errors.add(Field::RowKey, "Must be a non-negative integer.");
        } else {
            match row_key.parse::<u64>() {
                Ok(key) if !self.row_keys.insert(key) => {
                    errors.add(Field::RowKey, "Duplicate value.");
                }
                Ok(_) => {}
                Err(_) => errors.add(Field::RowKey, "Number too large."),
            }
        }
        row_key.to_string()
    }

    /// `"Last, First"` becomes `"Last^First"`
    fn normalize_name(&self, value: &str) -> String {
        self.name_separator.replace_all(value, "^").into_owned()
    }

    fn clean_date(
        &self,
        value: &str,
        field: Field,
        errors: &mut FieldErrors<'_>,
    ) -> Option<NaiveDate> {
        if value.is_empty() {
            return None;
        }

        let parsed = self
            .date_formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok());
        if parsed.is_none() {
            let column = errors.mapping.column_name(field).to_string();
            errors.add(field, format!("Invalid date format of {column}"));
        }
        parsed
    }
}

/// Report sink bound to one line
struct FieldErrors<'a> {
    report: &'a mut ValidationReport,
    mapping: &'a FieldMapping,
    line: usize,
}

impl FieldErrors<'_> {
    fn add(&mut self, field: Field, message: impl Into<String>) {
        self.report
            .add_field_error(self.line, self.mapping.column_name(field), message);
    }
}

fn check_length(value: &str, max: usize, field: Field, errors: &mut FieldErrors<'_>) {
    if value.chars().count() > max {
        errors.add(field, format!("Maximum {max} characters."));
    }
}

fn check_no_backslash(value: &str, field: Field, errors: &mut FieldErrors<'_>) {
    if value.contains('\\') {
        errors.add(field, "Contains invalid backslash character.");
    }
}

fn check_no_control_chars(value: &str, field: Field, errors: &mut FieldErrors<'_>) {
    if value.chars().any(|c| matches!(c, '\u{c}' | '\n' | '\r')) {
        errors.add(field, "Contains invalid control characters.");
    }
}

fn check_no_wildcards(value: &str, field: Field, errors: &mut FieldErrors<'_>) {
    if value.contains('*') || value.contains('?') {
        errors.add(field, "Contains invalid wildcard characters.");
    }
}

/// Returns the UID when it is present and valid
fn clean_uid<'v>(value: &'v str, field: Field, errors: &mut FieldErrors<'_>) -> Option<&'v str> {
    if value.is_empty() {
        return None;
    }
    match validate_uid(value) {
        Ok(()) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

fn clean_series_number(value: &str, errors: &mut FieldErrors<'_>) -> Option<i32> {
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(number) => match i32::try_from(number) {
            Ok(number) => Some(number),
            Err(_) => {
                errors.add(Field::SeriesNumber, "Value out of range.");
                None
            }
        },
        Err(_) => {
            errors.add(Field::SeriesNumber, "Must be an integer.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        vec!["%Y-%m-%d".to_string(), "%d.%m.%Y".to_string()]
    }

    fn clean(pairs: &[(&str, &str)]) -> (RequestRow, ValidationReport) {
        let mapping = FieldMapping::default();
        let formats = formats();
        let mut cleaner = RowCleaner::new(&mapping, &formats).unwrap();
        let mut report = ValidationReport::new();
        let row = cleaner.clean(&RawRow::from_pairs(2, pairs), &mut report);
        (row, report)
    }

    #[test]
    fn test_clean_valid_row() {
        let (row, report) = clean(&[
            ("RowKey", "1"),
            ("PatientID", " 1001 "),
            ("PatientName", "Doe ,  John"),
            ("PatientBirthDate", "01.02.1970"),
            ("StudyInstanceUID", "1.2.3"),
            ("SeriesNumber", "-4"),
        ]);
        assert!(report.is_empty(), "{report}");
        assert_eq!(row.patient_id, "1001");
        assert_eq!(row.patient_name, "Doe^John");
        assert_eq!(row.patient_birth_date, NaiveDate::from_ymd_opt(1970, 2, 1));
        assert_eq!(row.study_uid.as_ref().map(|u| u.as_str()), Some("1.2.3"));
        assert_eq!(row.series_uid, None);
        assert_eq!(row.series_number, Some(-4));
        assert_eq!(row.patient_descriptor(), "1001_Doe^John_1970-02-01");
    }

    #[test]
    fn test_invalid_date_names_column() {
        let (row, report) = clean(&[("RowKey", "1"), ("StudyDate", "2020/13/45")]);
        assert_eq!(row.study_date, None);
        assert_eq!(report.entries()[0].message, "Invalid date format of StudyDate");
        assert!(report.mentions_column("StudyDate"));
    }

    #[test]
    fn test_length_limits() {
        let long_id = "x".repeat(65);
        let (_, report) = clean(&[
            ("RowKey", "1"),
            ("PatientID", &long_id),
            ("Modality", "ABCDEFGHIJKLMNOPQ"),
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.entries()[0].message, "Maximum 64 characters.");
        assert!(report.mentions_column("Modality"));
    }

    #[test]
    fn test_patient_id_character_checks() {
        let (_, report) = clean(&[("RowKey", "1"), ("PatientID", "10*1\\")]);
        let messages: Vec<&str> = report.entries().iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"Contains invalid backslash character."));
        assert!(messages.contains(&"Contains invalid wildcard characters."));
    }

    #[test]
    fn test_uid_and_series_number_checks() {
        let (row, report) = clean(&[
            ("RowKey", "1"),
            ("StudyInstanceUID", "1.2.a"),
            ("SeriesNumber", "99999999999"),
        ]);
        assert_eq!(row.study_uid, None);
        assert_eq!(row.series_number, None);
        assert!(report.mentions_column("StudyInstanceUID"));
        assert!(report.mentions_column("SeriesNumber"));
    }

    #[test]
    fn test_row_key_checks() {
        let mapping = FieldMapping::default();
        let formats = formats();
        let mut cleaner = RowCleaner::new(&mapping, &formats).unwrap();
        let mut report = ValidationReport::new();

        cleaner.clean(&RawRow::from_pairs(2, &[("RowKey", "7")]), &mut report);
        assert!(report.is_empty());
        cleaner.clean(&RawRow::from_pairs(3, &[("RowKey", "7")]), &mut report);
        cleaner.clean(&RawRow::from_pairs(4, &[("RowKey", "abc")]), &mut report);
        cleaner.clean(&RawRow::from_pairs(5, &[("PatientID", "1")]), &mut report);

        let messages: Vec<(usize, &str)> = report
            .entries()
            .iter()
            .map(|e| (e.line, e.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            vec![
                (3, "Duplicate value."),
                (4, "Must be a non-negative integer."),
                (5, "Missing value."),
            ]
        );
    }

    #[test]
    fn test_blank_row_detection() {
        let mapping = FieldMapping::default();
        let formats = formats();
        let cleaner = RowCleaner::new(&mapping, &formats).unwrap();
        assert!(cleaner.is_blank(&RawRow::from_pairs(9, &[("PatientID", "  "), ("Other", "x")])));
        assert!(!cleaner.is_blank(&RawRow::from_pairs(9, &[("Modality", "CT")])));
    }
}
