// Media opener - Binds inputs on named disks and starts exports

use tracing::{debug, info};

use crate::app::container::ExportContext;
use crate::app::exporter::MediaExporter;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::TranscodeDriver;

/// Collects inputs from named disks and hands them to an exporter
#[derive(Debug, Clone)]
pub struct MediaOpener {
    ctx: ExportContext,
    disk: String,
    collection: MediaCollection,
    frame: Option<TimeSpec>,
    concat_copy: bool,
}

impl MediaOpener {
    /// Opener reading from `disk`
    pub fn new(disk: impl Into<String>, ctx: ExportContext) -> Self {
        Self::bound(disk, ctx, MediaCollection::new())
    }

    /// Opener on `disk` that already holds `collection`
    pub(crate) fn bound(disk: impl Into<String>, ctx: ExportContext, collection: MediaCollection) -> Self {
        Self {
            ctx,
            disk: disk.into(),
            collection,
            frame: None,
            concat_copy: false,
        }
    }

    /// Switch the disk used by later `open` calls
    pub fn from_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = disk.into();
        self
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    /// Append one input on the current disk
    pub fn open(mut self, path: &str) -> Result<Self, DomainError> {
        self.ctx.disks.get(&self.disk)?;
        let media = MediaRef::new(self.disk.clone(), path)?;
        debug!(input = %media, index = self.collection.len(), "Input opened");
        self.collection.push(media);
        Ok(self)
    }

    /// Append several inputs on the current disk, in order
    pub fn open_many<I, S>(self, paths: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths
            .into_iter()
            .try_fold(self, |opener, path| opener.open(path.as_ref()))
    }

    /// Inputs opened so far
    pub fn get(&self) -> &MediaCollection {
        &self.collection
    }

    /// Extract the frame at a time string (seconds, MM:SS or HH:MM:SS)
    pub fn get_frame_from_string(self, time: &str) -> Result<Self, DomainError> {
        Ok(self.get_frame_from_timecode(TimeSpec::parse(time)?))
    }

    pub fn get_frame_from_seconds(self, seconds: f64) -> Result<Self, DomainError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Invalid frame position: {} seconds",
                seconds
            )));
        }
        Ok(self.get_frame_from_timecode(TimeSpec::from_seconds(seconds)))
    }

    pub fn get_frame_from_timecode(mut self, position: TimeSpec) -> Self {
        self.frame = Some(position);
        self
    }

    /// Join the inputs with the concat demuxer, copying streams as they are
    pub fn concat_without_transcoding(mut self) -> Self {
        self.concat_copy = true;
        self
    }

    /// Resolve every input through its disk and start an export session
    pub async fn export(self) -> Result<MediaExporter, DomainError> {
        if self.collection.is_empty() {
            return Err(DomainError::BadArgs("No inputs opened".to_string()));
        }

        let mut driver = TranscodeDriver::new().with_threads(self.ctx.threads);
        driver
            .set_frame_position(self.frame.clone())
            .set_concat_copy(self.concat_copy);
        for media in self.collection.iter() {
            let disk = self.ctx.disks.get(media.disk())?;
            let local = disk.resolve_local_path(media.path()).await?;
            driver.add_input(local);
        }

        info!(
            inputs = self.collection.len(),
            frame = ?self.frame,
            concat_copy = self.concat_copy,
            "Export session opened"
        );
        Ok(MediaExporter::new(self.ctx, self.collection, driver))
    }

    /// Delete every temporary working directory. Returns how many were removed.
    pub async fn cleanup_temporary_files(&self) -> Result<usize, DomainError> {
        self.ctx.temp.delete_all().await
    }
}
