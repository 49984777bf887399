use std::sync::Arc;

use tracing::debug;

use crate::adapters::{FfmpegProcessAdapter, LocalDiskAdapter};
use crate::app::opener::MediaOpener;
use crate::domain::errors::DomainError;
use crate::output::{DiskRegistry, TemporaryDirectories};
use crate::ports::{AppConfig, EnginePort};

/// Collaborators shared by openers and exporters
#[derive(Clone)]
pub struct ExportContext {
    pub disks: DiskRegistry,
    pub engine: Arc<dyn EnginePort>,
    pub temp: Arc<TemporaryDirectories>,
    /// `-threads` passed per output, if set
    pub threads: Option<usize>,
}

impl std::fmt::Debug for ExportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportContext")
            .field("disks", &self.disks)
            .field("temp", &self.temp.root())
            .field("threads", &self.threads)
            .finish()
    }
}

pub trait AppContainer: Send + Sync {
    fn context(&self) -> ExportContext;
    fn opener(&self) -> MediaOpener;
}

pub struct DefaultAppContainer {
    context: ExportContext,
    default_disk: String,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg process engine and the configured local disks
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let engine = Arc::new(FfmpegProcessAdapter::from_config(config));
        Self::with_engine(config, engine)
    }

    /// Wire the configured disks around a given engine
    pub fn with_engine(config: &AppConfig, engine: Arc<dyn EnginePort>) -> Result<Self, DomainError> {
        let mut disks = DiskRegistry::new();
        for (name, disk_config) in &config.disks {
            let disk = LocalDiskAdapter::from_config(name, disk_config)?;
            disks.register(Arc::new(disk));
        }

        if !disks.contains(&config.default_disk) {
            return Err(DomainError::DiskNotFound(config.default_disk.clone()));
        }

        let threads = resolve_threads(config.threads);
        debug!(disks = ?disks.names(), threads = ?threads, temp_root = %config.temp_root.display(), "Container wired");

        Ok(Self {
            context: ExportContext {
                disks,
                engine,
                temp: Arc::new(TemporaryDirectories::new(&config.temp_root)),
                threads,
            },
            default_disk: config.default_disk.clone(),
        })
    }

    pub fn default_disk(&self) -> &str {
        &self.default_disk
    }

    pub fn temp(&self) -> &TemporaryDirectories {
        &self.context.temp
    }
}

impl AppContainer for DefaultAppContainer {
    fn context(&self) -> ExportContext {
        self.context.clone()
    }

    fn opener(&self) -> MediaOpener {
        MediaOpener::new(self.default_disk.clone(), self.context())
    }
}

/// `0` means one thread per available core
fn resolve_threads(configured: Option<usize>) -> Option<usize> {
    match configured {
        Some(0) => Some(num_cpus::get().max(1)),
        other => other,
    }
}
