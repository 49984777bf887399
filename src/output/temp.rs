//! Temporary working directories
//!
//! Every output reference gets its own directory under the temp root, named
//! after its disk and path, so the engine can write there before staging.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::fs;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::MediaRef;

/// Registry of working directories created by this process
#[derive(Debug)]
pub struct TemporaryDirectories {
    root: PathBuf,
    known: Mutex<BTreeSet<PathBuf>>,
}

impl TemporaryDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            known: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic directory name for a reference.
    ///
    /// Alphanumerics, `-` and `.` are kept; every other byte becomes `_xx`
    /// (lowercase hex). An escaped part never contains `__`, so the
    /// `<disk>__<path>` name is distinct for distinct references.
    pub fn dir_name_for(media: &MediaRef) -> String {
        format!("{}__{}", escape(media.disk()), escape(media.path()))
    }

    /// Working directory for a reference, whether or not it exists
    pub fn path_for(&self, media: &MediaRef) -> PathBuf {
        self.root.join(Self::dir_name_for(media))
    }

    /// Create an empty working directory for a reference. Leftovers from an
    /// earlier run are removed first.
    pub async fn create_for(&self, media: &MediaRef) -> Result<PathBuf, DomainError> {
        let dir = self.path_for(media);
        self.create_empty(&dir).await?;
        Ok(dir)
    }

    /// Directory for files that are never staged (concat lists)
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("scratch__{}", name))
    }

    pub async fn create_scratch(&self, name: &str) -> Result<PathBuf, DomainError> {
        let dir = self.scratch_path(name);
        self.create_empty(&dir).await?;
        Ok(dir)
    }

    async fn create_empty(&self, dir: &Path) -> Result<(), DomainError> {
        remove_tree(dir).await.map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to clear working directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        fs::create_dir_all(dir).await.map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to create working directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        self.lock_known().insert(dir.to_path_buf());
        debug!(dir = %dir.display(), "Working directory created");
        Ok(())
    }

    /// Remove one working directory
    pub async fn remove(&self, dir: &Path) -> Result<(), DomainError> {
        remove_tree(dir).await.map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to remove working directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        self.lock_known().remove(dir);
        Ok(())
    }

    /// Working directories created through this registry and not yet removed
    pub fn known(&self) -> Vec<PathBuf> {
        self.lock_known().iter().cloned().collect()
    }

    /// Delete every known working directory, and anything else left under the
    /// root by earlier processes. Returns the number of directories removed.
    pub async fn delete_all(&self) -> Result<usize, DomainError> {
        let mut targets: BTreeSet<PathBuf> = self.lock_known().clone();

        match fs::read_dir(&self.root).await {
            Ok(mut entries) => {
                let list_error = |e: io::Error| {
                    DomainError::FsFail(format!(
                        "Failed to list temp root {}: {}",
                        self.root.display(),
                        e
                    ))
                };
                while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
                    if entry.file_type().await.map_err(list_error)?.is_dir() {
                        targets.insert(entry.path());
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DomainError::FsFail(format!(
                    "Failed to list temp root {}: {}",
                    self.root.display(),
                    e
                )))
            }
        }

        let mut removed = 0;
        for dir in targets {
            if !fs::try_exists(&dir).await.unwrap_or(false) {
                self.lock_known().remove(&dir);
                continue;
            }
            match self.remove(&dir).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(dir = %dir.display(), error = %e, "Could not remove working directory"),
            }
        }

        debug!(removed, root = %self.root.display(), "Temporary directories deleted");
        Ok(removed)
    }

    fn lock_known(&self) -> std::sync::MutexGuard<'_, BTreeSet<PathBuf>> {
        self.known.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `remove_dir_all` that treats a missing directory as removed
async fn remove_tree(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn escape(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("_{:02x}", byte));
        }
    }
    escaped
}
