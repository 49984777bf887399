//! Export job files
//!
//! A job describes one export: inputs, format, filters, mappings and the
//! destination. Jobs are read from TOML, JSON or YAML depending on the file
//! extension.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::app::{MediaExporter, MediaOpener};
use crate::domain::errors::DomainError;
use crate::domain::model::{Format, MediaRef, Visibility};
use crate::error::{ExportError, ExportResult};

/// One export described in a job file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    /// Disk inputs are read from unless they name their own
    #[serde(default)]
    pub disk: Option<String>,
    pub inputs: Vec<JobInput>,
    #[serde(default)]
    pub format: Option<JobFormat>,
    /// Destination path of the single-output export
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub to_disk: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub filters: Vec<JobFilter>,
    #[serde(default)]
    pub mappings: Vec<JobMapping>,
    #[serde(default)]
    pub concat: Option<JobConcat>,
    /// Extract a single frame at this position
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub timelapse_framerate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobInput {
    Path(String),
    OnDisk { disk: String, path: String },
}

/// Preset name (`x264`, `hevc`, `webm`, `aac`, `mp3`, `image`) or explicit parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobFormat {
    Preset(String),
    Custom(Format),
}

impl JobFormat {
    pub fn to_format(&self) -> Result<Format, DomainError> {
        match self {
            JobFormat::Custom(format) => Ok(format.clone()),
            JobFormat::Preset(name) => match name.to_lowercase().as_str() {
                "x264" | "h264" => Ok(Format::x264()),
                "hevc" | "h265" => Ok(Format::hevc()),
                "webm" => Ok(Format::webm()),
                "aac" => Ok(Format::aac()),
                "mp3" => Ok(Format::mp3()),
                "image" => Ok(Format::image()),
                _ => Err(DomainError::BadArgs(format!(
                    "Unknown format preset: {}. Valid presets: x264, hevc, webm, aac, mp3, image",
                    name
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFilter {
    pub inputs: String,
    pub expression: String,
    pub outputs: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobMapping {
    pub format: JobFormat,
    pub output: String,
    /// Disk of the output; defaults to the job's destination disk
    #[serde(default)]
    pub disk: Option<String>,
    pub sources: Vec<String>,
    #[serde(default)]
    pub disable_audio: bool,
    #[serde(default)]
    pub disable_video: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConcat {
    /// Re-encode through the concat filter instead of copying streams
    #[serde(default = "enabled")]
    pub transcode: bool,
    #[serde(default = "enabled")]
    pub has_video: bool,
    #[serde(default = "enabled")]
    pub has_audio: bool,
}

fn enabled() -> bool {
    true
}

impl JobSpec {
    /// Read a job file, choosing the parser by extension
    pub fn load(path: &Path) -> ExportResult<Self> {
        if !path.is_file() {
            return Err(ExportError::JobFileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let invalid = |message: String| ExportError::InvalidJob {
            path: path.display().to_string(),
            message,
        };

        let job: JobSpec = match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            "json" => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            other => {
                return Err(invalid(format!(
                    "unsupported job file extension {:?}, expected toml, json, yaml or yml",
                    other
                )))
            }
        };

        if job.inputs.is_empty() {
            return Err(invalid("a job needs at least one input".to_string()));
        }

        debug!(path = %path.display(), inputs = job.inputs.len(), "Job loaded");
        Ok(job)
    }

    /// Open the inputs and configure an export session. Returns the session
    /// and the single-output destination path, if any.
    pub async fn build(&self, opener: MediaOpener) -> Result<(MediaExporter, Option<String>), DomainError> {
        let default_disk = self.disk.clone().unwrap_or_else(|| opener.disk().to_string());

        let mut opener = opener;
        for input in &self.inputs {
            opener = match input {
                JobInput::Path(path) => opener.from_disk(default_disk.as_str()).open(path)?,
                JobInput::OnDisk { disk, path } => opener.from_disk(disk.as_str()).open(path)?,
            };
        }

        if let Some(position) = &self.frame {
            opener = opener.get_frame_from_string(position)?;
        }
        let concat = self.concat.as_ref();
        if concat.map_or(false, |c| !c.transcode) {
            opener = opener.concat_without_transcoding();
        }

        let mut exporter = opener.export().await?;

        if let Some(format) = &self.format {
            exporter.in_format(format.to_format()?);
        }
        if let Some(disk) = &self.to_disk {
            exporter.to_disk(disk.as_str());
        }
        if let Some(visibility) = self.visibility {
            exporter.with_visibility(visibility);
        }
        if let Some(framerate) = self.timelapse_framerate {
            exporter.as_timelapse_with_framerate(framerate);
        }
        if let Some(concat) = concat.filter(|c| c.transcode) {
            exporter.concat_with_transcoding(concat.has_video, concat.has_audio);
        }

        for filter in &self.filters {
            exporter.add_filter(&filter.inputs, &filter.expression, &filter.outputs)?;
        }

        let destination_disk = self.to_disk.clone().unwrap_or(default_disk);
        for mapping in &self.mappings {
            let disk = mapping.disk.as_deref().unwrap_or(&destination_disk);
            exporter.add_format_output_mapping(
                mapping.format.to_format()?,
                MediaRef::new(disk, mapping.output.as_str())?,
                mapping.sources.iter().cloned(),
                mapping.disable_audio,
                mapping.disable_video,
            )?;
        }

        Ok((exporter, self.output.clone()))
    }
}
