//! CLI module for ffexport
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod job;

/// ffexport
///
/// Runs multi-output ffmpeg exports described in job files, staging the
/// results onto named disks.
#[derive(Parser, Debug)]
#[command(name = "ffexport")]
#[command(about = "Compose, run and stage ffmpeg exports")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "FFEXPORT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// ffmpeg binary to run
    #[arg(long, global = true)]
    pub ffmpeg: Option<String>,

    /// Root of the temporary working directories
    #[arg(long, global = true)]
    pub temp_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the export described by a job file
    Run(args::RunArgs),
    /// Print the ffmpeg command a job file would run
    Plan(args::PlanArgs),
    /// Remove all temporary working directories
    Cleanup,
}
