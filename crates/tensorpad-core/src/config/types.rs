//! Configuration type definitions for the execution service
//!
//! Every section is optional in the YAML file; an empty document yields the
//! defaults (bind on all interfaces, port 8000, `torch` framework, automatic
//! device selection).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use crate::errors::RuntimeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TensorpadConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub framework: FrameworkConfig,
    #[serde(default)]
    pub python: PythonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    /// Allowed CORS origins; any origin when unset.
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Import name of the tensor framework, injected as `torch`.
    #[serde(default = "default_framework_module")]
    pub module: String,
    /// Import name of its network-module namespace, injected as `nn`.
    #[serde(default = "default_nn_module")]
    pub nn_module: String,
    #[serde(default)]
    pub device: DevicePreference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Prepended to `sys.path` before the framework is imported.
    #[serde(default)]
    pub extra_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub colored: bool,
}

/// Which compute device to hand to submitted code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Probe accelerators: Apple MPS, then CUDA, then CPU.
    #[default]
    Auto,
    Mps,
    Cuda,
    Cpu,
}

impl DevicePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePreference::Auto => "auto",
            DevicePreference::Mps => "mps",
            DevicePreference::Cuda => "cuda",
            DevicePreference::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePreference {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "mps" => Ok(DevicePreference::Mps),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(RuntimeError::ConfigError(format!(
                "Unknown device '{}', expected one of auto, mps, cuda, cpu",
                other
            ))),
        }
    }
}

fn default_true() -> bool { true }
fn default_bind_addr() -> String { "0.0.0.0:8000".to_string() }
fn default_max_body_size() -> usize { 1024 * 1024 }
fn default_framework_module() -> String { "torch".to_string() }
fn default_nn_module() -> String { "torch.nn".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: true,
            cors_origins: None,
            max_body_size: default_max_body_size(),
            enable_logging: true,
        }
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            module: default_framework_module(),
            nn_module: default_nn_module(),
            device: DevicePreference::Auto,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored: true,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, RuntimeError> {
        self.bind_addr.parse().map_err(|e| {
            RuntimeError::ConfigError(format!(
                "Invalid bind address '{}': {}",
                self.bind_addr, e
            ))
        })
    }
}

impl TensorpadConfig {
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.server.socket_addr()?;

        if self.server.max_body_size == 0 {
            return Err(RuntimeError::ConfigError("server.max_body_size must be greater than 0".to_string()));
        }

        if self.framework.module.trim().is_empty() {
            return Err(RuntimeError::ConfigError("framework.module cannot be empty".to_string()));
        }

        if self.framework.nn_module.trim().is_empty() {
            return Err(RuntimeError::ConfigError("framework.nn_module cannot be empty".to_string()));
        }

        if let Some(origins) = &self.server.cors_origins {
            if origins.iter().any(|o| o.trim().is_empty()) {
                return Err(RuntimeError::ConfigError("server.cors_origins cannot contain empty entries".to_string()));
            }
        }

        Ok(())
    }
}
