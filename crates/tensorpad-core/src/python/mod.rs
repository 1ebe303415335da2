//! Embedded Python runtime: framework loading, execution and introspection.

pub mod capture;
pub mod executor;
pub mod framework;
pub mod sanitize;
pub mod scope;
pub mod structure;

pub use executor::{format_exception, PythonExecutor};
pub use framework::{DeviceKind, FrameworkHandles};
pub use structure::{extract_model_structure, LayerKind, OPAQUE_LAYER_TYPE};
