//! Configuration module for the execution service
//!
//! Settings come from an optional YAML file, `TENSORPAD_*` environment
//! variables and, in the binary, command-line flags.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;

#[cfg(test)]
mod tests;

use crate::errors::RuntimeError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<TensorpadConfig, RuntimeError> {
    ConfigLoader::from_file(path).await
}
