//! Configuration loader for YAML files and environment overrides
//!
//! This module handles loading configuration from YAML files, locating the
//! default file when none is given, and applying `TENSORPAD_*` environment
//! variables on top.

use crate::config::types::*;
use crate::errors::RuntimeError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ENV_BIND_ADDR: &str = "TENSORPAD_BIND_ADDR";
pub const ENV_DEVICE: &str = "TENSORPAD_DEVICE";
pub const ENV_FRAMEWORK: &str = "TENSORPAD_FRAMEWORK";
pub const ENV_LOG_LEVEL: &str = "TENSORPAD_LOG_LEVEL";

const LOCAL_CONFIG_FILE: &str = "tensorpad.yaml";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an explicit file, or from the first default
    /// location that exists, or fall back to defaults.
    pub async fn load(path: Option<&Path>) -> Result<TensorpadConfig, RuntimeError> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => match Self::discover() {
                Some(found) => {
                    log::info!("Using configuration file {}", found.display());
                    Self::from_file(&found).await
                }
                None => {
                    log::info!("No configuration file found, using defaults");
                    let mut config = TensorpadConfig::default();
                    Self::resolve_environment(&mut config)?;
                    config.validate()?;
                    Ok(config)
                }
            },
        }
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<TensorpadConfig, RuntimeError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            RuntimeError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_str(&content)?;

        // Relative python paths are relative to the config file
        if let Some(base_dir) = path.parent() {
            Self::resolve_paths(&mut config, base_dir);
        }

        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<TensorpadConfig, RuntimeError> {
        // An empty file deserializes to a unit value, not an empty mapping
        let mut config: TensorpadConfig = if content.trim().is_empty() {
            TensorpadConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                RuntimeError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::resolve_environment(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Default locations, in order: `./tensorpad.yaml`, then
    /// `<config dir>/tensorpad/config.yaml`.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("tensorpad").join("config.yaml"));
        }
        locations
    }

    fn discover() -> Option<PathBuf> {
        Self::default_locations().into_iter().find(|p| p.is_file())
    }

    /// Apply `TENSORPAD_*` overrides from the process environment
    fn resolve_environment(config: &mut TensorpadConfig) -> Result<(), RuntimeError> {
        if let Ok(bind_addr) = env::var(ENV_BIND_ADDR) {
            log::debug!("{} overrides bind address", ENV_BIND_ADDR);
            config.server.bind_addr = bind_addr;
        }

        if let Ok(device) = env::var(ENV_DEVICE) {
            log::debug!("{} overrides device selection", ENV_DEVICE);
            config.framework.device = device.parse()?;
        }

        if let Ok(framework) = env::var(ENV_FRAMEWORK) {
            log::debug!("{} overrides framework module", ENV_FRAMEWORK);
            config.framework.nn_module = format!("{}.nn", framework);
            config.framework.module = framework;
        }

        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }

        Ok(())
    }

    fn resolve_paths(config: &mut TensorpadConfig, base_dir: &Path) {
        for path in &mut config.python.extra_paths {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}
