//! Command implementations

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{PlanArgs, RunArgs};
use crate::cli::job::JobSpec;
use crate::ports::AppConfig;
use crate::utils::format_duration;

/// Execute the run command
pub async fn run(args: &RunArgs, container: &DefaultAppContainer) -> Result<()> {
    info!(job = %args.job.display(), "Starting export");

    let job = JobSpec::load(&args.job)?;
    let (mut exporter, output) = job
        .build(container.opener())
        .await
        .context("Failed to configure export")?;

    exporter.on_progress(|percentage| info!(percentage, "Progress"));

    let opener = exporter
        .save(output.as_deref())
        .await
        .context("Export failed")?;

    let report = exporter
        .report()
        .context("Export finished without a report")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for staged in &report.staged {
        for file in &staged.files {
            println!("{}:{}", staged.destination.disk(), file);
        }
    }
    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    println!(
        "Exported {} output(s) to disk {} in {}",
        report.staged.len(),
        opener.disk(),
        format_duration(elapsed)
    );
    Ok(())
}

/// Execute the plan command
pub async fn plan(args: &PlanArgs, container: &DefaultAppContainer, config: &AppConfig) -> Result<()> {
    let job = JobSpec::load(&args.job)?;
    let (exporter, output) = job
        .build(container.opener())
        .await
        .context("Failed to configure export")?;

    let plan = exporter
        .get_command(output.as_deref())
        .context("Failed to compose command")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", plan.command_line(&config.ffmpeg_binary));
    }
    Ok(())
}

/// Execute the cleanup command
pub async fn cleanup(container: &DefaultAppContainer) -> Result<()> {
    let temp = container.temp();
    if !temp.root().exists() {
        warn!(root = %temp.root().display(), "Temp root does not exist");
    }

    let removed = temp.delete_all().await?;
    println!(
        "Removed {} temporary director{} under {}",
        removed,
        if removed == 1 { "y" } else { "ies" },
        temp.root().display()
    );
    Ok(())
}
