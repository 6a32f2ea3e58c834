//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMEFILTER_CONFIG` (environment variable)
//! 2. `~/.config/mimefilter/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimefilter\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::filter::FilterSpec;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MIMEFILTER_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Input chunking.
    pub stream: StreamConfig,
    /// Default filter chain.
    pub filters: FiltersConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs and object state.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes read from the input per filter call (default: 4096).
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Filters applied, in order, when the command line names none.
    pub chain: Vec<FilterSpec>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { chunk_size: 4096 }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| FilterError::Config("could not determine config file path".into()))?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration to `path`, creating its parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FilterError::io(parent, e))?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| FilterError::Config(e.to_string()))?;
    std::fs::write(path, contents).map_err(|e| FilterError::io(path, e))?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mimefilter").join("config.toml"))
}

/// Return the cache directory for logs and object state.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimefilter")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mimefilter.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.stream.chunk_size, 4096);
        assert!(cfg.filters.chain.is_empty());
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.filters.chain = vec![
            FilterSpec::StripHeader("Bcc".to_string()),
            FilterSpec::From,
        ];
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        assert!(toml_str.contains("strip-header:Bcc"));
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[filters]
chain = ["chomp", "crlf-encode-dots"]
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.filters.chain.len(), 2);
        assert_eq!(cfg.filters.chain[1].to_string(), "crlf-encode-dots");
        // Other fields use defaults
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.stream.chunk_size, 4096);
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let bad = r#"
[filters]
chain = ["gzip"]
"#;
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn test_save_config_to_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.stream.chunk_size = 512;
        cfg.filters.chain = vec![FilterSpec::Chomp];

        save_config_to(&cfg, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Config = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_save_config_to_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let err = save_config_to(&Config::default(), &blocker.join("config.toml")).unwrap_err();
        assert!(matches!(err, FilterError::Io { .. }));
    }

    #[test]
    fn test_cache_dir_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/mf-cache"));
        assert_eq!(cache_dir(&cfg), PathBuf::from("/tmp/mf-cache"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/mf-cache/mimefilter.log")
        );
    }
}
