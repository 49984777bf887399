//! Staging of produced files from working directories to destination disks

use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaRef, Visibility};
use crate::output::disks::DiskRegistry;
use crate::output::temp::TemporaryDirectories;

/// One destination after staging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedOutput {
    pub destination: MediaRef,
    /// Disk-relative paths written for this destination
    pub files: Vec<String>,
}

/// Copies every file an export produced for a destination onto its disk
pub struct Stager<'a> {
    disks: &'a DiskRegistry,
    temp: &'a TemporaryDirectories,
}

impl<'a> Stager<'a> {
    pub fn new(disks: &'a DiskRegistry, temp: &'a TemporaryDirectories) -> Self {
        Self { disks, temp }
    }

    /// Stage destinations in order. Stops at the first failure; destinations
    /// staged before it stay in place and are listed in the error.
    pub async fn stage_all(
        &self,
        destinations: &[MediaRef],
        visibility: Option<Visibility>,
    ) -> Result<Vec<StagedOutput>, DomainError> {
        let mut staged: Vec<StagedOutput> = Vec::with_capacity(destinations.len());

        for destination in destinations {
            match self.stage(destination, visibility).await {
                Ok(output) => staged.push(output),
                Err(e) => {
                    let staged_names: Vec<String> =
                        staged.iter().map(|s| s.destination.to_string()).collect();
                    error!(destination = %destination, error = %e, staged = ?staged_names, "Staging failed");
                    return Err(match e {
                        DomainError::StagingFailure {
                            destination,
                            message,
                            ..
                        } => DomainError::StagingFailure {
                            destination,
                            message,
                            staged: staged_names,
                        },
                        other => DomainError::StagingFailure {
                            destination: destination.to_string(),
                            message: other.to_string(),
                            staged: staged_names,
                        },
                    });
                }
            }
        }

        Ok(staged)
    }

    /// Copy all files from the destination's working directory next to the
    /// destination path, then remove the working directory.
    pub async fn stage(
        &self,
        destination: &MediaRef,
        visibility: Option<Visibility>,
    ) -> Result<StagedOutput, DomainError> {
        let failure = |message: String| DomainError::StagingFailure {
            destination: destination.to_string(),
            message,
            staged: Vec::new(),
        };

        let disk = self
            .disks
            .get(destination.disk())
            .map_err(|e| failure(e.to_string()))?;
        let visibility = visibility.or_else(|| disk.default_visibility());
        let working_dir = self.temp.path_for(destination);

        let walk_dir = working_dir.clone();
        let produced = tokio::task::spawn_blocking(move || produced_files(&walk_dir))
            .await
            .map_err(|e| failure(format!("listing {} failed: {}", working_dir.display(), e)))?
            .map_err(failure)?;
        if produced.is_empty() {
            return Err(failure(format!(
                "engine produced no file in {}",
                working_dir.display()
            )));
        }

        let mut files = Vec::with_capacity(produced.len());
        for relative in produced {
            let target = join_disk_path(destination.directory(), &relative);
            let source = working_dir.join(&relative);

            disk.write(&target, &source, visibility)
                .await
                .map_err(|e| failure(format!("copy of {} failed: {}", relative, e)))?;
            debug!(disk = %disk.name(), path = %target, "File staged");
            files.push(target);
        }

        self.temp
            .remove(&working_dir)
            .await
            .map_err(|e| failure(e.to_string()))?;

        info!(destination = %destination, files = files.len(), "Destination staged");
        Ok(StagedOutput {
            destination: destination.clone(),
            files,
        })
    }
}

/// Files below `dir`, as sorted `/`-separated relative paths
fn produced_files(dir: &Path) -> Result<Vec<String>, String> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| e.to_string())?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        files.push(relative);
    }
    Ok(files)
}

fn join_disk_path(directory: &str, relative: &str) -> String {
    if directory.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", directory, relative)
    }
}
