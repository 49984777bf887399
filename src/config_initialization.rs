//! Configuration initialization and hierarchy management

use tracing::{debug, info};

use crate::adapters::toml_config::DEFAULT_CONFIG_PATHS;
use crate::adapters::TomlConfigAdapter;
use crate::cli::Cli;
use crate::error::{ExportError, ExportResult};
use crate::ports::ConfigPort;

/// Build configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> ExportResult<TomlConfigAdapter> {
    initialize_with_env(cli, |key| std::env::var(key).ok())
}

/// Same as [`initialize_configuration_hierarchy`] with an explicit
/// environment lookup
pub fn initialize_with_env<F>(cli: &Cli, env: F) -> ExportResult<TomlConfigAdapter>
where
    F: Fn(&str) -> Option<String>,
{
    // Step 1: defaults
    let mut adapter = TomlConfigAdapter::new();

    // Step 2: file, an explicit one must exist
    match &cli.config {
        Some(path) => {
            if !path.is_file() {
                return Err(ExportError::ConfigError {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            adapter.load_file(path).map_err(config_error)?;
        }
        None => {
            if adapter
                .load_first_existing(&DEFAULT_CONFIG_PATHS)
                .map_err(config_error)?
                .is_none()
            {
                debug!("No config file loaded, using defaults");
            }
        }
    }

    // Step 3: environment
    adapter.apply_env_with(env).map_err(config_error)?;

    // Step 4: command line
    apply_cli_configuration_overrides(&mut adapter, cli);

    adapter.validate_config().map_err(config_error)?;
    Ok(adapter)
}

fn apply_cli_configuration_overrides(adapter: &mut TomlConfigAdapter, cli: &Cli) {
    let config = adapter.config_mut();
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
        cli_overrides += 1;
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
        cli_overrides += 1;
    }
    if let Some(binary) = &cli.ffmpeg {
        config.ffmpeg_binary = binary.clone();
        cli_overrides += 1;
    }
    if let Some(temp_dir) = &cli.temp_dir {
        config.temp_root = temp_dir.clone();
        cli_overrides += 1;
    }

    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }
}

fn config_error(e: crate::domain::errors::DomainError) -> ExportError {
    ExportError::ConfigError {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_beats_env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffexport.toml");
        std::fs::write(
            &path,
            "[ffexport]\nlog_level = \"warn\"\nffmpeg_binary = \"/file/ffmpeg\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "ffexport",
            "--config",
            path.to_str().unwrap(),
            "--ffmpeg",
            "/cli/ffmpeg",
            "cleanup",
        ]);
        let adapter = initialize_with_env(&cli, |key| match key {
            "FFEXPORT_FFMPEG_BINARY" => Some("/env/ffmpeg".to_string()),
            "FFEXPORT_LOG_LEVEL" => Some("error".to_string()),
            _ => None,
        })
        .unwrap();

        let config = adapter.config();
        assert_eq!(config.ffmpeg_binary, "/cli/ffmpeg");
        assert_eq!(config.log_level, "error");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(adapter.config_file_path(), Some(path.as_path()));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let cli = Cli::parse_from(["ffexport", "--config", "/nonexistent/ffexport.toml", "cleanup"]);
        assert!(matches!(
            initialize_with_env(&cli, |_| None),
            Err(ExportError::ConfigError { .. })
        ));
    }

    #[test]
    fn invalid_cli_value_fails_validation() {
        let cli = Cli::parse_from(["ffexport", "--log-format", "xml", "cleanup"]);
        assert!(initialize_with_env(&cli, |_| None).is_err());
    }
}
