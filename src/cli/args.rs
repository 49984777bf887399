//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job file (.toml, .json, .yaml or .yml)
    #[arg(short, long)]
    pub job: PathBuf,

    /// Print the export report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Job file (.toml, .json, .yaml or .yml)
    #[arg(short, long)]
    pub job: PathBuf,

    /// Print the full invocation plan as JSON
    #[arg(long)]
    pub json: bool,
}
