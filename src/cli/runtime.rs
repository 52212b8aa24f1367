use std::env;
use std::fs as stdfs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use frameweave_cli::config::{resolve_config_path, AppConfig};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fill unset environment variables from `config/local.env` (`KEY=value` lines).
pub fn load_local_env_overrides() {
    let path = Path::new("config/local.env");
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.context("failed to install tracing subscriber")?;

    Ok(())
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
}

/// Priority: `--config` > ./config/frameweave.yaml > <config_dir>/frameweave/config.yaml,
/// then environment overrides on top.
pub async fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(config_path);

    let mut config = match fs::read_to_string(&path).await {
        Ok(raw) => {
            let loaded = AppConfig::from_yaml_str(&raw)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            loaded
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Config file not found, using defaults: {}", path.display());
            AppConfig::default()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read config file {}", path.display()));
        }
    };

    config
        .apply_process_env()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig { config, path })
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_values_are_unescaped() {
        assert_eq!(unescape_value("\"a\\tb\""), "a\tb");
        assert_eq!(unescape_value("plain"), "plain");
        assert_eq!(unescape_value("\""), "\"");
    }

    #[tokio::test]
    async fn config_file_is_read_and_bad_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        stdfs::write(&good, "timeouts:\n  navigation_ms: 12000\n").unwrap();
        let loaded = load_config(Some(good.as_path())).await.expect("config loads");
        assert_eq!(loaded.path, good);
        assert_eq!(loaded.config.timeouts.navigation_ms, 12_000);

        let bad = dir.path().join("bad.yaml");
        stdfs::write(&bad, "browser: [oops\n").unwrap();
        let err = load_config(Some(bad.as_path())).await.unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"), "{err:#}");
    }
}
