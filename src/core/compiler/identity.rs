//! Cross-row patient identity checks
//!
//! Rows are checked incrementally: each row is compared against what earlier
//! rows established about the same patient ID or pseudonym.

use super::mapping::{Field, FieldMapping};
use super::row::RequestRow;
use crate::domain::report::ValidationReport;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct IdentityTracker {
    descriptors_by_patient_id: HashMap<String, String>,
    descriptors_by_pseudonym: HashMap<String, String>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `row` against earlier rows and the identifiability rules
    ///
    /// `failed` lists the fields of the row that failed cleaning. Their values
    /// are kept out of the cross-row comparisons, the identifiability rules
    /// always run.
    pub fn check(
        &mut self,
        row: &RequestRow,
        failed: &[Field],
        mapping: &FieldMapping,
        report: &mut ValidationReport,
    ) {
        let has_name = !row.patient_name.is_empty();
        let has_birth_date = row.patient_birth_date.is_some();
        let descriptor = row.patient_descriptor();
        let descriptor_valid = ![Field::PatientId, Field::PatientName, Field::PatientBirthDate]
            .iter()
            .any(|field| failed.contains(field));

        // Patient ID must not be given for two different name / birth date pairs
        if descriptor_valid && !row.patient_id.is_empty() && (has_name || has_birth_date) {
            match self.descriptors_by_patient_id.get(&row.patient_id) {
                Some(known) if *known != descriptor => {
                    report.add_row_error(
                        row.line,
                        "The same PatientID was also given for a different \
                         PatientName / PatientBirthDate.",
                    );
                }
                Some(_) => {}
                None => {
                    self.descriptors_by_patient_id
                        .insert(row.patient_id.clone(), descriptor.clone());
                }
            }
        }

        if descriptor_valid && !failed.contains(&Field::Pseudonym) && !row.pseudonym.is_empty() {
            match self.descriptors_by_pseudonym.get(&row.pseudonym) {
                Some(known) if *known != descriptor => {
                    report.add_field_error(
                        row.line,
                        mapping.column_name(Field::Pseudonym),
                        "Pseudonym already used for another patient.",
                    );
                }
                Some(_) => {}
                None => {
                    self.descriptors_by_pseudonym
                        .insert(row.pseudonym.clone(), descriptor);
                }
            }
        }

        // An accession number identifies the study on its own
        if !row.accession_number.is_empty() {
            return;
        }

        if has_name && !has_birth_date {
            report.add_row_error(
                row.line,
                "When PatientName is present then PatientBirthDate must also be present.",
            );
        } else if has_birth_date && !has_name {
            report.add_row_error(
                row.line,
                "When PatientBirthDate is present then PatientName must also be present.",
            );
        }

        if row.patient_id.is_empty() && !(has_name && has_birth_date) {
            report.add_row_error(
                row.line,
                "AccessionNumber or PatientID or PatientName and PatientBirthDate \
                 must be present.",
            );
        }
    }
}
