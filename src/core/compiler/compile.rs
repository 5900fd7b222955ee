//! Request compilation: cleaning, cross-row checks and grouping into tasks

use super::identity::IdentityTracker;
use super::mapping::{Field, FieldMapping};
use super::row::{RawRow, RequestRow, RowCleaner};
use crate::config::BatchConfig;
use crate::domain::errors::StudyhubError;
use crate::domain::ids::{validate_uid, SeriesUid, StudyUid};
use crate::domain::report::ValidationReport;
use crate::domain::Result;
use crate::domain::task::CompiledTask;
use crate::log_batch_compiled;
use std::collections::{HashMap, HashSet};

/// Settings of a [`RequestCompiler`]
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub mapping: FieldMapping,
    pub max_batch_size: usize,
    /// chrono strftime formats, first match wins
    pub date_formats: Vec<String>,
    /// When false every row must carry a pseudonym
    pub can_transfer_unpseudonymized: bool,
}

impl CompilerOptions {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            mapping: FieldMapping::default(),
            max_batch_size: config.max_batch_size,
            date_formats: config.date_input_formats.clone(),
            can_transfer_unpseudonymized: config.can_transfer_unpseudonymized,
        }
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

/// Turns batch rows into validated, grouped transfer tasks
///
/// # Examples
///
/// ```
/// use studyhub::core::compiler::{CompilerOptions, RawRow, RequestCompiler};
///
/// let mut options = CompilerOptions::default();
/// options.can_transfer_unpseudonymized = true;
/// let compiler = RequestCompiler::new(options);
///
/// let rows = vec![
///     RawRow::from_pairs(2, &[("RowKey", "1"), ("PatientID", "222"),
///         ("StudyInstanceUID", "1.2.4"), ("SeriesInstanceUID", "1.2.4.1")]),
///     RawRow::from_pairs(3, &[("RowKey", "2"), ("PatientID", "222"),
///         ("StudyInstanceUID", "1.2.4"), ("SeriesInstanceUID", "1.2.4.2")]),
/// ];
///
/// let tasks = compiler.compile(&rows).unwrap();
/// assert_eq!(tasks.len(), 1);
/// assert_eq!(tasks[0].series_uids.len(), 2);
/// assert_eq!(tasks[0].source_lines, vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestCompiler {
    options: CompilerOptions,
}

impl RequestCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile rows, failing on too many tasks or on any validation problem
    ///
    /// # Errors
    ///
    /// - [`StudyhubError::BatchSize`] when the rows group into more tasks than
    ///   allowed. This is decided from the raw keys before any row is cleaned.
    /// - [`StudyhubError::BatchFormat`] carrying the full report otherwise.
    pub fn compile(&self, rows: &[RawRow]) -> Result<Vec<CompiledTask>> {
        let task_count = self.count_tasks(rows)?;
        if task_count > self.options.max_batch_size {
            tracing::warn!(
                tasks = task_count,
                max = self.options.max_batch_size,
                "Batch file rejected as too large"
            );
            return Err(StudyhubError::BatchSize {
                actual: task_count,
                max: self.options.max_batch_size,
            });
        }

        let (tasks, report) = self.parse(rows)?;

        if !report.is_empty() {
            tracing::warn!(
                problems = report.len(),
                lines = report.lines().len(),
                "Batch file rejected"
            );
            return Err(StudyhubError::BatchFormat(report));
        }

        log_batch_compiled!(rows.len(), tasks.len());
        Ok(tasks)
    }

    /// Number of tasks the rows group into
    ///
    /// Only the patient ID and study UID of each row are looked at, rows
    /// without a valid study UID form no task.
    pub fn count_tasks(&self, rows: &[RawRow]) -> Result<usize> {
        let cleaner = RowCleaner::new(&self.options.mapping, &self.options.date_formats)?;
        let mut keys = HashSet::new();
        for raw in rows.iter().filter(|raw| !cleaner.is_blank(raw)) {
            let study_uid = cleaner.value(raw, Field::StudyUid);
            if validate_uid(study_uid).is_ok() {
                keys.insert((cleaner.value(raw, Field::PatientId), study_uid));
            }
        }
        Ok(keys.len())
    }

    /// Single pass over all rows, returning the tasks and every problem found
    ///
    /// Tasks are returned even when the report is non-empty so report entries
    /// can name the task their line belongs to.
    pub fn parse(&self, rows: &[RawRow]) -> Result<(Vec<CompiledTask>, ValidationReport)> {
        let mapping = &self.options.mapping;
        let mut cleaner = RowCleaner::new(mapping, &self.options.date_formats)?;
        let mut identity = IdentityTracker::new();
        let mut report = ValidationReport::new();
        let mut grouper = TaskGrouper::default();

        for raw in rows {
            if cleaner.is_blank(raw) {
                tracing::trace!(line = raw.line, "Skipping blank row");
                continue;
            }

            let problems_before = report.len();
            let row = cleaner.clean(raw, &mut report);
            let failed = failed_identity_fields(&report, problems_before, mapping);

            if !self.options.can_transfer_unpseudonymized && row.pseudonym.is_empty() {
                report.add_field_error(
                    row.line,
                    mapping.column_name(Field::Pseudonym),
                    "A pseudonym is required.",
                );
            }

            if mapping.is_mapped(Field::StudyUid)
                && row.study_uid.is_none()
                && cleaner.value(raw, Field::StudyUid).is_empty()
            {
                report.add_field_error(
                    row.line,
                    mapping.column_name(Field::StudyUid),
                    "This field is required.",
                );
            }

            identity.check(&row, &failed, mapping, &mut report);

            grouper.add(&row, mapping, &mut report);
        }

        let tasks = grouper.into_tasks();

        let mut task_for_line = HashMap::new();
        for task in &tasks {
            for line in &task.source_lines {
                task_for_line.insert(*line, task.task_id);
            }
        }
        report.assign_task_ids(|line| task_for_line.get(&line).copied());

        Ok((tasks, report))
    }
}

/// Identity fields with a cleaning problem among the report entries from `since`
fn failed_identity_fields(
    report: &ValidationReport,
    since: usize,
    mapping: &FieldMapping,
) -> Vec<Field> {
    let recent = &report.entries()[since..];
    [
        Field::PatientId,
        Field::PatientName,
        Field::PatientBirthDate,
        Field::Pseudonym,
    ]
    .into_iter()
    .filter(|field| {
        let column = mapping.column_name(*field);
        recent.iter().any(|entry| entry.column.as_deref() == Some(column))
    })
    .collect()
}

/// Rows sharing a patient ID and study
#[derive(Debug)]
struct TaskGroup {
    patient_id: String,
    study_uid: StudyUid,
    series_uids: Vec<SeriesUid>,
    whole_study: bool,
    pseudonym: String,
    lines: Vec<usize>,
}

/// Groups rows by `(patient_id, study_uid)` in first-seen order
#[derive(Debug, Default)]
struct TaskGrouper {
    groups: Vec<TaskGroup>,
    index: HashMap<(String, StudyUid), usize>,
}

impl TaskGrouper {
    fn add(&mut self, row: &RequestRow, mapping: &FieldMapping, report: &mut ValidationReport) {
        let Some(study_uid) = row.study_uid.clone() else {
            return;
        };

        let key = (row.patient_id.clone(), study_uid.clone());
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.groups.push(TaskGroup {
                    patient_id: row.patient_id.clone(),
                    study_uid,
                    series_uids: Vec::new(),
                    whole_study: false,
                    pseudonym: row.pseudonym.clone(),
                    lines: Vec::new(),
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[position];
        group.lines.push(row.line);

        if group.pseudonym.is_empty() {
            group.pseudonym = row.pseudonym.clone();
        } else if !row.pseudonym.is_empty() && row.pseudonym != group.pseudonym {
            report.add_field_error(
                row.line,
                mapping.column_name(Field::Pseudonym),
                "A different pseudonym was already given for this study.",
            );
        }

        match &row.series_uid {
            Some(series_uid) => {
                if !group.series_uids.contains(series_uid) {
                    group.series_uids.push(series_uid.clone());
                }
            }
            None => group.whole_study = true,
        }
    }

    fn into_tasks(self) -> Vec<CompiledTask> {
        self.groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| CompiledTask {
                task_id: index + 1,
                patient_id: group.patient_id,
                study_uid: group.study_uid,
                series_uids: if group.whole_study {
                    Vec::new()
                } else {
                    group.series_uids
                },
                pseudonym: group.pseudonym,
                source_lines: group.lines,
            })
            .collect()
    }
}
