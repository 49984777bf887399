// Ports - Interface definitions (contracts)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::InvocationPlan;

/// Port for one named storage disk
#[async_trait]
pub trait DiskPort: Send + Sync {
    /// Name the disk is registered under
    fn name(&self) -> &str;

    /// Visibility applied when the export does not choose one
    fn default_visibility(&self) -> Option<Visibility>;

    /// Resolve a disk-relative path to a path the engine can read
    async fn resolve_local_path(&self, path: &str) -> Result<PathBuf, DomainError>;

    /// Check if a file exists on the disk
    async fn exists(&self, path: &str) -> Result<bool, DomainError>;

    /// Store the contents of a local file at `path`. Readers must never
    /// observe a partially written file.
    async fn write(
        &self,
        path: &str,
        source: &Path,
        visibility: Option<Visibility>,
    ) -> Result<(), DomainError>;

    /// Apply visibility to an existing file
    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), DomainError>;
}

/// Progress reported by the engine while it runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Percentage of the expected work (0.0 - 100.0)
    pub percentage: f64,
}

/// Result of a successful engine run
#[derive(Debug, Clone, Default)]
pub struct EngineOutcome {
    /// Tail of the engine's diagnostic output
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Port for the transcode engine
#[async_trait]
pub trait EnginePort: Send + Sync {
    /// Run one invocation plan to completion, reporting progress as it goes.
    /// A failed or killed process is an `EngineFailure`.
    async fn run(
        &self,
        plan: &InvocationPlan,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<EngineOutcome, DomainError>;
}

/// Settings for one configured disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_disk: String,
    pub temp_root: PathBuf,
    pub ffmpeg_binary: String,
    pub timeout_secs: Option<u64>,
    pub threads: Option<usize>,
    pub log_level: String,
    pub log_format: String,
    pub disks: BTreeMap<String, DiskConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            "local".to_string(),
            DiskConfig {
                root: PathBuf::from("."),
                visibility: None,
            },
        );

        Self {
            default_disk: "local".to_string(),
            temp_root: std::env::temp_dir().join("ffexport"),
            ffmpeg_binary: "ffmpeg".to_string(),
            timeout_secs: None,
            threads: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            disks,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Port for configuration management
pub trait ConfigPort: Send + Sync {
    /// Current configuration
    fn config(&self) -> &AppConfig;

    /// Validate configuration
    fn validate_config(&self) -> Result<(), DomainError>;

    /// Path the configuration was loaded from, if any
    fn config_file_path(&self) -> Option<&Path>;
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
