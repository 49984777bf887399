// Domain models - Core types and data structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string in seconds, MM:SS.ms or HH:MM:SS.ms form
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if seconds < 0.0 {
                return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = minutes
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs(format!("Invalid minutes in '{}'", trimmed)))?;
                let seconds = Self::parse_seconds_part(seconds, trimmed)?;
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = hours
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs(format!("Invalid hours in '{}'", trimmed)))?;
                let minutes = minutes
                    .parse::<u32>()
                    .map_err(|_| DomainError::BadArgs(format!("Invalid minutes in '{}'", trimmed)))?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
                }
                let seconds = Self::parse_seconds_part(seconds, trimmed)?;
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(DomainError::BadArgs(format!(
                "Invalid time format '{}'. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                trimmed
            ))),
        }
    }

    fn parse_seconds_part(part: &str, whole: &str) -> Result<f64, DomainError> {
        let seconds = part
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid seconds in '{}'", whole)))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
        }
        Ok(seconds)
    }

    /// Format as HH:MM:SS.mmm, the form ffmpeg accepts for `-ss`
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Visibility applied to staged files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(DomainError::BadArgs(format!(
                "Invalid visibility: {}. Valid values: public, private",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// Immutable handle to one file on a named disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    disk: String,
    path: String,
}

impl MediaRef {
    /// Create a reference to `path` on `disk`. The path is disk-relative.
    pub fn new(disk: impl Into<String>, path: impl Into<String>) -> Result<Self, DomainError> {
        let disk = disk.into();
        let path = path.into();

        if disk.trim().is_empty() {
            return Err(DomainError::BadArgs("Disk name cannot be empty".to_string()));
        }
        let normalized = path.trim().trim_start_matches('/').replace('\\', "/");
        if normalized.is_empty() {
            return Err(DomainError::BadArgs("Media path cannot be empty".to_string()));
        }
        if normalized.split('/').any(|segment| segment == "..") {
            return Err(DomainError::BadArgs(format!(
                "Media path must stay inside its disk: {}",
                path
            )));
        }

        Ok(Self {
            disk,
            path: normalized,
        })
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Disk-relative directory holding this file ("" for the disk root)
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(index) => &self.path[..index],
            None => "",
        }
    }

}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.disk, self.path)
    }
}

/// Ordered, append-only inputs of an export session.
/// Insertion order is the input index used by filter labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaCollection {
    items: Vec<MediaRef>,
}

impl MediaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, media: MediaRef) {
        self.items.push(media);
    }

    pub fn first(&self) -> Option<&MediaRef> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&MediaRef> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&MediaRef> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaRef> {
        self.items.iter()
    }
}

/// Target encoding parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub video_kbps: Option<u32>,
    pub audio_kbps: Option<u32>,
    pub audio_channels: Option<u32>,
    /// Output options appended after the codec settings
    pub extra_parameters: Vec<String>,
    /// Options placed before the inputs
    pub initial_parameters: Vec<String>,
}

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x264() -> Self {
        Self::new().with_video_codec("libx264").with_audio_codec("aac")
    }

    pub fn hevc() -> Self {
        Self::new().with_video_codec("libx265").with_audio_codec("aac")
    }

    pub fn webm() -> Self {
        Self::new()
            .with_video_codec("libvpx-vp9")
            .with_audio_codec("libopus")
    }

    pub fn aac() -> Self {
        Self::new().with_audio_codec("aac")
    }

    pub fn mp3() -> Self {
        Self::new().with_audio_codec("libmp3lame")
    }

    /// Still image output (frame extraction, thumbnails)
    pub fn image() -> Self {
        Self::new().with_extra_parameters(["-f", "image2"])
    }

    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn with_video_kbps(mut self, kbps: u32) -> Self {
        self.video_kbps = Some(kbps);
        self
    }

    pub fn with_audio_kbps(mut self, kbps: u32) -> Self {
        self.audio_kbps = Some(kbps);
        self
    }

    pub fn with_audio_channels(mut self, channels: u32) -> Self {
        self.audio_channels = Some(channels);
        self
    }

    pub fn with_extra_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_parameters.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn initial_parameters(&self) -> &[String] {
        &self.initial_parameters
    }

    pub fn set_initial_parameters(&mut self, params: Vec<String>) {
        self.initial_parameters = params;
    }

    /// Output-side arguments for this format, in ffmpeg order
    pub fn output_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(codec) = &self.video_codec {
            args.push("-vcodec".to_string());
            args.push(codec.clone());
        }
        if let Some(kbps) = self.video_kbps {
            args.push("-b:v".to_string());
            args.push(format!("{}k", kbps));
        }
        if let Some(codec) = &self.audio_codec {
            args.push("-acodec".to_string());
            args.push(codec.clone());
        }
        if let Some(kbps) = self.audio_kbps {
            args.push("-b:a".to_string());
            args.push(format!("{}k", kbps));
        }
        if let Some(channels) = self.audio_channels {
            args.push("-ac".to_string());
            args.push(channels.to_string());
        }
        args.extend(self.extra_parameters.iter().cloned());

        args
    }
}

/// One filter-graph edge: `[in0][in1]expression[out0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexFilter {
    pub inputs: Vec<String>,
    pub expression: String,
    pub outputs: Vec<String>,
}

impl ComplexFilter {
    /// Build a declaration from label strings such as `"[0][1]"`
    pub fn new(inputs: &str, expression: &str, outputs: &str) -> Result<Self, DomainError> {
        if expression.trim().is_empty() {
            return Err(DomainError::BadArgs(
                "Filter expression cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            inputs: parse_labels(inputs)?,
            expression: expression.trim().to_string(),
            outputs: parse_labels(outputs)?,
        })
    }

    /// Render as one filter-graph chain
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for label in &self.inputs {
            rendered.push('[');
            rendered.push_str(label);
            rendered.push(']');
        }
        rendered.push_str(&self.expression);
        for label in &self.outputs {
            rendered.push('[');
            rendered.push_str(label);
            rendered.push(']');
        }
        rendered
    }
}

/// Split a label string like `"[0][v1]"` into `["0", "v1"]`
pub fn parse_labels(labels: &str) -> Result<Vec<String>, DomainError> {
    let mut parsed = Vec::new();
    let mut rest = labels.trim();

    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('[') else {
            return Err(DomainError::BadArgs(format!(
                "Labels must be bracketed, got '{}'",
                labels
            )));
        };
        let Some(end) = stripped.find(']') else {
            return Err(DomainError::BadArgs(format!(
                "Unterminated label in '{}'",
                labels
            )));
        };
        let label = stripped[..end].trim();
        if label.is_empty() {
            return Err(DomainError::BadArgs(format!("Empty label in '{}'", labels)));
        }
        parsed.push(label.to_string());
        rest = stripped[end + 1..].trim_start();
    }

    Ok(parsed)
}

/// One output's sources, format and destination
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMapping {
    sources: Vec<String>,
    format: Format,
    output: MediaRef,
    disable_audio: bool,
    disable_video: bool,
}

impl OutputMapping {
    /// Sources are filter output labels (`[v1]`) or raw input stream
    /// specifiers (`0:a`, `[1:v]`). They are checked at apply time.
    pub fn new(
        sources: Vec<String>,
        format: Format,
        output: MediaRef,
        disable_audio: bool,
        disable_video: bool,
    ) -> Result<Self, DomainError> {
        let sources: Vec<String> = sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sources.is_empty() {
            return Err(DomainError::BadArgs(format!(
                "Output mapping for {} needs at least one source label",
                output
            )));
        }

        Ok(Self {
            sources,
            format,
            output,
            disable_audio,
            disable_video,
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn output(&self) -> &MediaRef {
        &self.output
    }

    pub fn disable_audio(&self) -> bool {
        self.disable_audio
    }

    pub fn disable_video(&self) -> bool {
        self.disable_video
    }
}

/// Concatenation with re-encoding through the `concat` filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatOptions {
    pub has_video: bool,
    pub has_audio: bool,
}

impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            has_video: true,
            has_audio: true,
        }
    }
}

/// Export session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportState {
    Configuring,
    Composing,
    Executing,
    Staging,
    Done,
    Failed,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Configuring => "configuring",
            ExportState::Composing => "composing",
            ExportState::Executing => "executing",
            ExportState::Staging => "staging",
            ExportState::Done => "done",
            ExportState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests;
