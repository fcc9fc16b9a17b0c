//! Configuration loader utilities

use crate::{Config, ConfigBuilder, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides, e.g. `ROCKSYNC__PERFORMANCE__WORKER_COUNT`
pub const ENV_PREFIX: &str = "ROCKSYNC";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default locations
    pub fn load_default() -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new().add_defaults();

        if let Some(path) = Self::config_exists() {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            });
        }

        ConfigBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::Serialization {
                    message: format!("Failed to serialize to TOML: {}", e),
                })?
            }
            Some("json") => serde_json::to_string_pretty(config)?,
            _ => serde_yaml::to_string(config)?,
        };

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Config::default(), path)
    }

    /// Check if a configuration file exists in default locations
    pub fn config_exists() -> Option<PathBuf> {
        Self::get_default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }

    /// Get default configuration file paths in order of preference
    fn get_default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("rocksync.yaml"),
            PathBuf::from("rocksync.yml"),
            PathBuf::from("rocksync.toml"),
            PathBuf::from("rocksync.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let rocksync_dir = config_dir.join("rocksync");
            paths.push(rocksync_dir.join("config.yaml"));
            paths.push(rocksync_dir.join("config.toml"));
        }

        paths
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
            })
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|home| PathBuf::from(home).join(".config"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
