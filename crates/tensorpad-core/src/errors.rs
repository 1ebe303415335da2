//! Error types for the execution runtime
//!
//! Exceptions raised by submitted code are not represented here; they are
//! part of a normal `ExecutionResponse`. These variants cover the runtime
//! itself: bad configuration, a framework that cannot be imported, a device
//! that cannot be used, and interpreter failures outside user code.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Framework '{module}' could not be loaded: {message}")]
    FrameworkUnavailable { module: String, message: String },
    #[error("Device '{0}' is not available on this host")]
    DeviceUnavailable(String),
    #[error("Python error: {0}")]
    PythonError(String),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::IoError(err.to_string())
    }
}

impl From<pyo3::PyErr> for RuntimeError {
    fn from(err: pyo3::PyErr) -> Self {
        RuntimeError::PythonError(err.to_string())
    }
}
