//! Compiled transfer task
//!
//! The unit of work handed to the transfer executor. One task moves one
//! study of one patient, either completely or restricted to some series.

use super::ids::{SeriesUid, StudyUid};
use serde::{Deserialize, Serialize};

/// A validated, grouped transfer task
///
/// Tasks are created by the request compiler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTask {
    /// Sequential id starting at 1, in order of first appearance in the batch file
    pub task_id: usize,

    /// Patient ID of the study
    pub patient_id: String,

    /// Study to transfer
    pub study_uid: StudyUid,

    /// Series to transfer, empty means the whole study
    pub series_uids: Vec<SeriesUid>,

    /// Pseudonym to apply during transfer, empty for none
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pseudonym: String,

    /// Batch file lines that contributed to this task
    pub source_lines: Vec<usize>,
}

impl CompiledTask {
    /// Whether the whole study is transferred rather than selected series
    pub fn is_whole_study(&self) -> bool {
        self.series_uids.is_empty()
    }

    /// Whether the study is pseudonymized during transfer
    pub fn is_pseudonymized(&self) -> bool {
        !self.pseudonym.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(series: &[&str]) -> CompiledTask {
        CompiledTask {
            task_id: 1,
            patient_id: "1001".to_string(),
            study_uid: StudyUid::new("1.2.3").unwrap(),
            series_uids: series.iter().map(|s| SeriesUid::new(*s).unwrap()).collect(),
            pseudonym: String::new(),
            source_lines: vec![2],
        }
    }

    #[test]
    fn test_whole_study() {
        assert!(task(&[]).is_whole_study());
        assert!(!task(&["1.2.3.1"]).is_whole_study());
    }

    #[test]
    fn test_serialization_skips_empty_pseudonym() {
        let json = serde_json::to_value(task(&["1.2.3.1"])).unwrap();
        assert!(json.get("pseudonym").is_none());
        assert_eq!(json["series_uids"][0], "1.2.3.1");
        assert_eq!(json["source_lines"][0], 2);
    }
}
