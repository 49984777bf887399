// Local filesystem disk adapter - A named disk rooted at a local directory

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Disk backed by a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDiskAdapter {
    name: String,
    root: PathBuf,
    visibility: Option<Visibility>,
}

impl LocalDiskAdapter {
    /// Create a disk named `name` rooted at `root`. The root is created if missing.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let name = name.into();
        let root = root.into();

        fs::create_dir_all(&root).map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to create root of disk {}: {}: {}",
                name,
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            name,
            root,
            visibility: None,
        })
    }

    pub fn from_config(name: &str, config: &DiskConfig) -> Result<Self, DomainError> {
        Ok(Self::new(name, &config.root)?.with_visibility(config.visibility))
    }

    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a disk-relative path
    fn full_path(&self, path: &str) -> Result<PathBuf, DomainError> {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() || relative.split(['/', '\\']).any(|c| c == "..") {
            return Err(DomainError::BadArgs(format!(
                "Invalid path on disk {}: {:?}",
                self.name, path
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Copy `source` next to `target` and rename it into place
    fn copy_into_place(
        source: &Path,
        parent: &Path,
        target: &Path,
        visibility: Visibility,
    ) -> Result<(), DomainError> {
        fs::create_dir_all(parent)
            .map_err(|e| DomainError::FsFail(format!("Failed to create directory: {}", e)))?;

        let mut staged = NamedTempFile::new_in(parent)
            .map_err(|e| DomainError::FsFail(format!("Failed to create temp file: {}", e)))?;
        let mut reader = fs::File::open(source).map_err(|e| {
            DomainError::FsFail(format!("Failed to open {}: {}", source.display(), e))
        })?;
        io::copy(&mut reader, staged.as_file_mut()).map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                target.display(),
                e
            ))
        })?;

        Self::apply_permissions(staged.path(), visibility)
            .map_err(|e| DomainError::FsFail(format!("Failed to set visibility: {}", e)))?;

        staged.persist(target).map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to move file into {}: {}",
                target.display(),
                e.error
            ))
        })?;
        Ok(())
    }

    #[cfg(unix)]
    fn apply_permissions(path: &Path, visibility: Visibility) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mode = match visibility {
            Visibility::Public => 0o644,
            Visibility::Private => 0o600,
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn apply_permissions(path: &Path, visibility: Visibility) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(visibility == Visibility::Private);
        fs::set_permissions(path, permissions)
    }
}

#[async_trait]
impl DiskPort for LocalDiskAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    async fn resolve_local_path(&self, path: &str) -> Result<PathBuf, DomainError> {
        self.full_path(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, DomainError> {
        let target = self.full_path(path)?;
        Ok(tokio::fs::metadata(target)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false))
    }

    async fn write(
        &self,
        path: &str,
        source: &Path,
        visibility: Option<Visibility>,
    ) -> Result<(), DomainError> {
        let target = self.full_path(path)?;
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        // Temp files are created owner-only
        let visibility = visibility.or(self.visibility).unwrap_or(Visibility::Public);
        let source = source.to_path_buf();

        blocking(move || Self::copy_into_place(&source, &parent, &target, visibility)).await?;

        debug!(disk = %self.name, path = %path, "File written");
        Ok(())
    }

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), DomainError> {
        let target = self.full_path(path)?;
        let name = self.name.clone();
        let path = path.to_string();
        blocking(move || {
            if !target.is_file() {
                return Err(DomainError::FsFail(format!(
                    "File does not exist on disk {}: {}",
                    name, path
                )));
            }
            Self::apply_permissions(&target, visibility)
                .map_err(|e| DomainError::FsFail(format!("Failed to set visibility: {}", e)))
        })
        .await
    }
}

/// Run filesystem work on the blocking pool
async fn blocking<F>(work: F) -> Result<(), DomainError>
where
    F: FnOnce() -> Result<(), DomainError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::InternalError(format!("Filesystem task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> (tempfile::TempDir, LocalDiskAdapter) {
        let root = tempfile::tempdir().unwrap();
        let disk = LocalDiskAdapter::new("local", root.path()).unwrap();
        (root, disk)
    }

    #[tokio::test]
    async fn write_creates_directories_and_replaces_content() {
        let (root, disk) = disk();
        let source = root.path().join("source.bin");
        fs::write(&source, b"first").unwrap();

        disk.write("exports/out.mp4", &source, None).await.unwrap();
        assert!(disk.exists("exports/out.mp4").await.unwrap());

        fs::write(&source, b"second").unwrap();
        disk.write("exports/out.mp4", &source, None).await.unwrap();
        let written = fs::read(root.path().join("exports/out.mp4")).unwrap();
        assert_eq!(written, b"second");
    }

    #[tokio::test]
    async fn paths_escaping_the_root_are_rejected() {
        let (_root, disk) = disk();
        assert!(disk.resolve_local_path("../etc/passwd").await.is_err());
        assert!(disk.resolve_local_path("").await.is_err());
        assert_eq!(
            disk.resolve_local_path("/a/b.mp4").await.unwrap(),
            disk.root().join("a/b.mp4")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn visibility_maps_to_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (root, disk) = disk();
        let source = root.path().join("source.bin");
        fs::write(&source, b"data").unwrap();

        disk.write("private.mp4", &source, Some(Visibility::Private))
            .await
            .unwrap();
        let mode = fs::metadata(root.path().join("private.mp4")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        disk.set_visibility("private.mp4", Visibility::Public).await.unwrap();
        let mode = fs::metadata(root.path().join("private.mp4")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn set_visibility_on_missing_file_fails() {
        let (_root, disk) = disk();
        assert!(matches!(
            disk.set_visibility("missing.mp4", Visibility::Public).await,
            Err(DomainError::FsFail(_))
        ));
    }
}
