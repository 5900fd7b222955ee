//! Validation report for batch request files
//!
//! Errors found while compiling a batch file are collected here instead of
//! failing on the first bad row, so all problems can be corrected in one pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single problem found in a batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 1-based line number in the batch file (the header is line 1)
    pub line: usize,

    /// Task the offending line was grouped into, if known
    pub task_id: Option<usize>,

    /// Column name the problem refers to, `None` for row-level problems
    pub column: Option<String>,

    /// Human readable message
    pub message: String,
}

/// Ordered list of batch file problems
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    entries: Vec<ReportEntry>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with a specific column
    pub fn add_field_error(
        &mut self,
        line: usize,
        column: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.entries.push(ReportEntry {
            line,
            task_id: None,
            column: Some(column.into()),
            message: message.into(),
        });
    }

    /// Record a problem that concerns the row as a whole
    pub fn add_row_error(&mut self, line: usize, message: impl Into<String>) {
        self.entries.push(ReportEntry {
            line,
            task_id: None,
            column: None,
            message: message.into(),
        });
    }

    /// Annotate entries with the task their line was grouped into
    pub fn assign_task_ids<F>(&mut self, task_for_line: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        for entry in &mut self.entries {
            entry.task_id = task_for_line(entry.line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Line numbers with at least one problem, in order of first appearance
    pub fn lines(&self) -> Vec<usize> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            if !lines.contains(&entry.line) {
                lines.push(entry.line);
            }
        }
        lines
    }

    /// Whether any entry refers to the given column
    pub fn mentions_column(&self, column: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.column.as_deref() == Some(column))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines().into_iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }

            let block: Vec<&ReportEntry> = self.entries.iter().filter(|e| e.line == line).collect();
            match block.first().and_then(|e| e.task_id) {
                Some(task_id) => writeln!(f, "Invalid data on line {line} (task {task_id}):")?,
                None => writeln!(f, "Invalid data on line {line}:")?,
            }

            for entry in block {
                match &entry.column {
                    Some(column) => writeln!(f, "{column} - {}", entry.message)?,
                    None => writeln!(f, "{}", entry.message)?,
                }
            }
        }
        Ok(())
    }
}
