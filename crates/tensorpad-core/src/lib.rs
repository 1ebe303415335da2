//! Embedded Python execution runtime for tensorpad
//!
//! Loads a tensor framework into an embedded CPython interpreter, runs
//! submitted snippets against a scope seeded with the framework handles, and
//! reports console output, training-loss history and model structure.
//!
//! ```no_run
//! use tensorpad_core::{PythonExecutor, TensorpadConfig};
//! use tensorpad_types::ExecutionRequest;
//!
//! let executor = PythonExecutor::initialize(&TensorpadConfig::default())?;
//! let response = executor.run_blocking(&ExecutionRequest::new("print(torch.ones(2))"))?;
//! println!("{}", response.stdout);
//! # Ok::<(), tensorpad_core::RuntimeError>(())
//! ```

pub mod config;
pub mod errors;
pub mod python;

#[cfg(feature = "http_handler_feature")]
pub mod execution_handler;

pub use config::{ConfigLoader, DevicePreference, TensorpadConfig};
pub use errors::RuntimeError;
pub use python::{DeviceKind, PythonExecutor};
