//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Studyhub using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Studyhub - imaging study transfer backbone
#[derive(Parser, Debug)]
#[command(name = "studyhub")]
#[command(version, about, long_about = None)]
#[command(author = "Studyhub Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "studyhub.toml", env = "STUDYHUB_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "STUDYHUB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Compile a batch request file into transfer tasks
    Compile(commands::compile::CompileArgs),

    /// Evaluate the transfer schedule window
    Schedule(commands::schedule::ScheduleArgs),

    /// Run the relay server and drain the staging folder into it
    Serve(commands::serve::ServeArgs),

    /// Receive files published on a relay topic
    Subscribe(commands::subscribe::SubscribeArgs),

    /// Show relay reachability and schedule state
    Status(commands::status::StatusArgs),
}
