//! Field to column mapping for batch files

use std::collections::BTreeMap;
use std::fmt;

/// A logical field of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    RowKey,
    PatientId,
    PatientName,
    PatientBirthDate,
    AccessionNumber,
    StudyDate,
    StudyDateStart,
    StudyDateEnd,
    Modality,
    Pseudonym,
    StudyUid,
    SeriesUid,
    SeriesNumber,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::RowKey,
        Field::PatientId,
        Field::PatientName,
        Field::PatientBirthDate,
        Field::AccessionNumber,
        Field::StudyDate,
        Field::StudyDateStart,
        Field::StudyDateEnd,
        Field::Modality,
        Field::Pseudonym,
        Field::StudyUid,
        Field::SeriesUid,
        Field::SeriesNumber,
    ];

    /// Column header used for this field when no explicit mapping is given
    pub fn default_column(self) -> &'static str {
        match self {
            Field::RowKey => "RowKey",
            Field::PatientId => "PatientID",
            Field::PatientName => "PatientName",
            Field::PatientBirthDate => "PatientBirthDate",
            Field::AccessionNumber => "AccessionNumber",
            Field::StudyDate => "StudyDate",
            Field::StudyDateStart => "StudyDateStart",
            Field::StudyDateEnd => "StudyDateEnd",
            Field::Modality => "Modality",
            Field::Pseudonym => "Pseudonym",
            Field::StudyUid => "StudyInstanceUID",
            Field::SeriesUid => "SeriesInstanceUID",
            Field::SeriesNumber => "SeriesNumber",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_column())
    }
}

/// Maps request fields to the column headers of a batch file
///
/// Fields without a mapping are treated as empty in every row.
///
/// # Examples
///
/// ```
/// use studyhub::core::compiler::{Field, FieldMapping};
///
/// let mapping = FieldMapping::default().with(Field::RowKey, "BatchID");
/// assert_eq!(mapping.column(Field::RowKey), Some("BatchID"));
/// assert_eq!(mapping.column(Field::PatientId), Some("PatientID"));
///
/// let minimal = FieldMapping::empty().with(Field::StudyUid, "Study");
/// assert_eq!(minimal.column(Field::SeriesUid), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    columns: BTreeMap<Field, String>,
}

impl FieldMapping {
    /// A mapping without any field
    pub fn empty() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    /// Map `field` to `column`, replacing an earlier mapping
    pub fn with(mut self, field: Field, column: impl Into<String>) -> Self {
        self.columns.insert(field, column.into());
        self
    }

    /// Remove the mapping of `field`
    pub fn without(mut self, field: Field) -> Self {
        self.columns.remove(&field);
        self
    }

    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn is_mapped(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Column name for reporting, falls back to the default header
    pub fn column_name(&self, field: Field) -> &str {
        self.column(field).unwrap_or(field.default_column())
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Field::ALL
            .iter()
            .fold(Self::empty(), |mapping, field| {
                mapping.with(*field, field.default_column())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping_covers_all_fields() {
        let mapping = FieldMapping::default();
        for field in Field::ALL {
            assert_eq!(mapping.column(field), Some(field.default_column()));
        }
        assert_eq!(mapping.fields().count(), Field::ALL.len());
    }

    #[test]
    fn test_without_removes_field() {
        let mapping = FieldMapping::default().without(Field::SeriesUid);
        assert!(!mapping.is_mapped(Field::SeriesUid));
        assert_eq!(mapping.column_name(Field::SeriesUid), "SeriesInstanceUID");
    }
}
