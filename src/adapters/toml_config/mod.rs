// TOML config adapter - Configuration loaded from TOML files and the environment

use crate::domain::errors::*;
use crate::ports::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "FFEXPORT_";

/// Locations searched when no config file is given explicitly
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["ffexport.toml", "config/ffexport.toml"];

/// Supported log output formats
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// `[ffexport]` section; absent keys keep their current value
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneralSection {
    default_disk: Option<String>,
    temp_root: Option<PathBuf>,
    ffmpeg_binary: Option<String>,
    timeout_secs: Option<u64>,
    threads: Option<usize>,
    log_level: Option<String>,
    log_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ffexport: GeneralSection,
    #[serde(default)]
    disks: BTreeMap<String, DiskConfig>,
}

/// TOML configuration adapter
#[derive(Debug, Clone, Default)]
pub struct TomlConfigAdapter {
    config: AppConfig,
    config_file_path: Option<PathBuf>,
}

impl TomlConfigAdapter {
    /// Adapter holding the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Merge settings from a TOML file
    pub fn load_file(&mut self, path: &Path) -> Result<(), DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::ConfigFail(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        self.merge_toml(&content).map_err(|e| match e {
            DomainError::ConfigFail(msg) => {
                DomainError::ConfigFail(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        self.config_file_path = Some(path.to_path_buf());

        info!(path = %path.display(), "Configuration file loaded");
        Ok(())
    }

    /// Merge the first config file found among `candidates`, if any
    pub fn load_first_existing<P: AsRef<Path>>(
        &mut self,
        candidates: &[P],
    ) -> Result<Option<PathBuf>, DomainError> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.is_file() {
                self.load_file(path)?;
                return Ok(Some(path.to_path_buf()));
            }
        }
        debug!("No configuration file found");
        Ok(None)
    }

    /// Merge settings from TOML text
    pub fn merge_toml(&mut self, content: &str) -> Result<(), DomainError> {
        let parsed: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::ConfigFail(format!("Failed to parse TOML config: {}", e)))?;

        let general = parsed.ffexport;
        let config = &mut self.config;
        if let Some(value) = general.default_disk {
            config.default_disk = value;
        }
        if let Some(value) = general.temp_root {
            config.temp_root = value;
        }
        if let Some(value) = general.ffmpeg_binary {
            config.ffmpeg_binary = value;
        }
        if general.timeout_secs.is_some() {
            config.timeout_secs = general.timeout_secs;
        }
        if general.threads.is_some() {
            config.threads = general.threads;
        }
        if let Some(value) = general.log_level {
            config.log_level = value;
        }
        if let Some(value) = general.log_format {
            config.log_format = value;
        }
        config.disks.extend(parsed.disks);

        Ok(())
    }

    /// Apply `FFEXPORT_*` variables using `lookup`. Returns how many were set.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<usize, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let parse_number = |name: &str, value: &str| -> Result<u64, DomainError> {
            value.trim().parse::<u64>().map_err(|_| {
                DomainError::ConfigFail(format!(
                    "{}{} must be a whole number, got {:?}",
                    ENV_PREFIX, name, value
                ))
            })
        };

        let mut applied = 0;
        let config = &mut self.config;

        if let Some(value) = var("DEFAULT_DISK") {
            config.default_disk = value;
            applied += 1;
        }
        if let Some(value) = var("TEMP_ROOT") {
            config.temp_root = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = var("FFMPEG_BINARY") {
            config.ffmpeg_binary = value;
            applied += 1;
        }
        if let Some(value) = var("TIMEOUT_SECS") {
            config.timeout_secs = Some(parse_number("TIMEOUT_SECS", &value)?);
            applied += 1;
        }
        if let Some(value) = var("THREADS") {
            config.threads = Some(parse_number("THREADS", &value)? as usize);
            applied += 1;
        }
        if let Some(value) = var("LOG_LEVEL") {
            config.log_level = value;
            applied += 1;
        }
        if let Some(value) = var("LOG_FORMAT") {
            config.log_format = value;
            applied += 1;
        }

        if applied > 0 {
            info!("Applied {} environment variable overrides", applied);
        }
        Ok(applied)
    }
}

impl ConfigPort for TomlConfigAdapter {
    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn validate_config(&self) -> Result<(), DomainError> {
        let config = &self.config;

        if !config.disks.contains_key(&config.default_disk) {
            return Err(DomainError::ConfigFail(format!(
                "Default disk '{}' is not configured. Configured disks: {}",
                config.default_disk,
                config.disks.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        for (name, disk) in &config.disks {
            if name.trim().is_empty() {
                return Err(DomainError::ConfigFail("Disk names cannot be empty".to_string()));
            }
            if disk.root.as_os_str().is_empty() {
                return Err(DomainError::ConfigFail(format!(
                    "Disk '{}' has an empty root",
                    name
                )));
            }
        }

        if config.ffmpeg_binary.trim().is_empty() {
            return Err(DomainError::ConfigFail(
                "ffmpeg_binary cannot be empty".to_string(),
            ));
        }

        if config.timeout_secs == Some(0) {
            return Err(DomainError::ConfigFail(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        LogLevel::parse(&config.log_level)
            .map_err(|e| DomainError::ConfigFail(e.to_string()))?;

        if !LOG_FORMATS.contains(&config.log_format.as_str()) {
            return Err(DomainError::ConfigFail(format!(
                "Invalid log format: {}. Valid formats: {}",
                config.log_format,
                LOG_FORMATS.join(", ")
            )));
        }

        Ok(())
    }

    fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Visibility;

    #[test]
    fn defaults_are_valid() {
        let adapter = TomlConfigAdapter::new();
        adapter.validate_config().unwrap();
        assert_eq!(adapter.config().default_disk, "local");
        assert!(adapter.config_file_path().is_none());
    }

    #[test]
    fn file_settings_and_disks_are_merged() {
        let mut adapter = TomlConfigAdapter::new();
        adapter
            .merge_toml(
                r#"
                [ffexport]
                default_disk = "media"
                timeout_secs = 600
                log_format = "json"

                [disks.media]
                root = "/srv/media"
                visibility = "private"
                "#,
            )
            .unwrap();

        let config = adapter.config();
        assert_eq!(config.default_disk, "media");
        assert_eq!(config.timeout_secs, Some(600));
        assert_eq!(config.ffmpeg_binary, "ffmpeg");
        assert_eq!(config.disks["media"].visibility, Some(Visibility::Private));
        assert!(config.disks.contains_key("local"));
        adapter.validate_config().unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut adapter = TomlConfigAdapter::new();
        let err = adapter
            .merge_toml("[ffexport]\nffmpeg_path = \"/usr/bin/ffmpeg\"\n")
            .unwrap_err();
        assert!(matches!(err, DomainError::ConfigFail(_)));
    }

    #[test]
    fn env_overrides_file() {
        let mut adapter = TomlConfigAdapter::new();
        adapter.merge_toml("[ffexport]\nlog_level = \"warn\"\n").unwrap();

        let applied = adapter
            .apply_env_with(|key| match key {
                "FFEXPORT_LOG_LEVEL" => Some("debug".to_string()),
                "FFEXPORT_THREADS" => Some("4".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(adapter.config().log_level, "debug");
        assert_eq!(adapter.config().threads, Some(4));
    }

    #[test]
    fn malformed_env_number_is_config_failure() {
        let mut adapter = TomlConfigAdapter::new();
        let err = adapter
            .apply_env_with(|key| (key == "FFEXPORT_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, DomainError::ConfigFail(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases: Vec<fn(&mut AppConfig)> = vec![
            |c| c.default_disk = "missing".to_string(),
            |c| c.ffmpeg_binary = " ".to_string(),
            |c| c.timeout_secs = Some(0),
            |c| c.log_level = "loud".to_string(),
            |c| c.log_format = "xml".to_string(),
        ];

        for mutate in cases {
            let mut adapter = TomlConfigAdapter::new();
            mutate(adapter.config_mut());
            assert!(matches!(
                adapter.validate_config(),
                Err(DomainError::ConfigFail(_))
            ));
        }
    }

    #[test]
    fn load_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffexport.toml");
        std::fs::write(&path, "[ffexport]\nffmpeg_binary = \"/opt/ffmpeg/bin/ffmpeg\"\n").unwrap();

        let mut adapter = TomlConfigAdapter::new();
        let loaded = adapter
            .load_first_existing(&[dir.path().join("missing.toml"), path.clone()])
            .unwrap();

        assert_eq!(loaded, Some(path.clone()));
        assert_eq!(adapter.config_file_path(), Some(path.as_path()));
        assert_eq!(adapter.config().ffmpeg_binary, "/opt/ffmpeg/bin/ffmpeg");
    }
}
