//! Compile command implementation
//!
//! Loads a delimited batch file, compiles it and prints either the tasks or
//! the validation report.

use super::load_validated_config;
use crate::core::compiler::{load_csv_file, CompilerOptions, RequestCompiler};
use crate::domain::{CompiledTask, StudyhubError};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Batch file to compile
    pub file: PathBuf,

    /// Print tasks as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl CompileArgs {
    /// Execute the compile command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(config) = load_validated_config(config_path) else {
            return Ok(2);
        };

        tracing::info!(file = %self.file.display(), "Compiling batch file");

        let compiler = RequestCompiler::new(CompilerOptions::from_config(&config.batch));
        let result = load_csv_file(&self.file, config.batch.delimiter_byte())
            .and_then(|rows| compiler.compile(&rows));

        match result {
            Ok(tasks) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&tasks)?);
                } else {
                    print_tasks(&tasks);
                }
                Ok(0)
            }
            Err(StudyhubError::BatchFormat(report)) => {
                eprintln!("❌ Batch file has {} problem(s):", report.len());
                eprintln!();
                eprintln!("{report}");
                Ok(3)
            }
            Err(e @ StudyhubError::BatchSize { .. }) => {
                eprintln!("❌ {e}");
                Ok(3)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to compile batch file");
                eprintln!("❌ {e}");
                Ok(5)
            }
        }
    }
}

fn print_tasks(tasks: &[CompiledTask]) {
    println!("Compiled {} task(s):", tasks.len());
    println!();
    println!(
        "{:<6} {:<20} {:<40} {:<10} {:<20} {:<10}",
        "Task", "Patient ID", "Study UID", "Series", "Pseudonym", "Lines"
    );
    println!("{}", "-".repeat(110));

    for task in tasks {
        let series = if task.is_whole_study() {
            "all".to_string()
        } else {
            task.series_uids.len().to_string()
        };
        let lines = task
            .source_lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(",");

        println!(
            "{:<6} {:<20} {:<40} {:<10} {:<20} {:<10}",
            task.task_id,
            task.patient_id,
            task.study_uid.as_str(),
            series,
            if task.is_pseudonymized() { task.pseudonym.as_str() } else { "-" },
            lines
        );
    }
    println!();
}
