//! Framework handles and compute device selection.
//!
//! The framework module, its `nn` namespace and the selected device object
//! are imported once and shared by every execution. The tensor and module
//! base types are resolved at the same time so scope introspection can do
//! `isinstance` checks without re-importing anything.

use pyo3::prelude::*;
use pyo3::types::PyList;
use std::fmt;
use std::path::PathBuf;

use crate::config::{DevicePreference, FrameworkConfig};
use crate::errors::RuntimeError;

/// A concrete compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Apple silicon (Metal Performance Shaders)
    Mps,
    Cuda,
    Cpu,
}

impl DeviceKind {
    /// Probe order used by automatic selection.
    pub const PREFERENCE: [DeviceKind; 3] = [DeviceKind::Mps, DeviceKind::Cuda, DeviceKind::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Mps => "mps",
            DeviceKind::Cuda => "cuda",
            DeviceKind::Cpu => "cpu",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeviceKind::Mps => "Apple Silicon (MPS)",
            DeviceKind::Cuda => "NVIDIA GPU (CUDA)",
            DeviceKind::Cpu => "CPU",
        }
    }

    fn forced_by(preference: DevicePreference) -> Option<DeviceKind> {
        match preference {
            DevicePreference::Auto => None,
            DevicePreference::Mps => Some(DeviceKind::Mps),
            DevicePreference::Cuda => Some(DeviceKind::Cuda),
            DevicePreference::Cpu => Some(DeviceKind::Cpu),
        }
    }

    /// Ask the framework whether this device can be used.
    ///
    /// A missing probe (older framework builds without `backends.mps`) counts
    /// as unavailable.
    fn is_available(&self, framework: &Bound<'_, PyModule>) -> bool {
        let probe = match self {
            DeviceKind::Mps => framework
                .getattr("backends")
                .and_then(|backends| backends.getattr("mps")),
            DeviceKind::Cuda => framework.getattr("cuda"),
            DeviceKind::Cpu => return true,
        };

        probe
            .and_then(|namespace| namespace.call_method0("is_available"))
            .and_then(|available| available.extract::<bool>())
            .unwrap_or_else(|e| {
                log::debug!("{} availability probe failed: {}", self.as_str(), e);
                false
            })
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the device to hand to submitted code.
pub fn select_device(
    framework: &Bound<'_, PyModule>,
    preference: DevicePreference,
) -> Result<DeviceKind, RuntimeError> {
    if let Some(forced) = DeviceKind::forced_by(preference) {
        if !forced.is_available(framework) {
            return Err(RuntimeError::DeviceUnavailable(forced.as_str().to_string()));
        }
        return Ok(forced);
    }

    Ok(DeviceKind::PREFERENCE
        .into_iter()
        .find(|kind| kind.is_available(framework))
        .unwrap_or(DeviceKind::Cpu))
}

/// Prepend directories to `sys.path`, skipping ones already present.
pub fn extend_sys_path(py: Python<'_>, paths: &[PathBuf]) -> PyResult<()> {
    if paths.is_empty() {
        return Ok(());
    }

    let sys_path = py.import_bound("sys")?.getattr("path")?.downcast_into::<PyList>()?;
    for path in paths.iter().rev() {
        let path = path.to_string_lossy();
        if !sys_path.contains(path.as_ref())? {
            log::debug!("Adding {} to sys.path", path);
            sys_path.insert(0, path.as_ref())?;
        }
    }
    Ok(())
}

/// Handles injected into every execution scope, plus the types used to
/// recognize tensors and network modules afterwards.
pub struct FrameworkHandles {
    framework_name: String,
    framework: Py<PyModule>,
    nn: Py<PyModule>,
    device: Py<PyAny>,
    device_kind: DeviceKind,
    tensor_type: Py<PyAny>,
    module_type: Py<PyAny>,
    version: Option<String>,
}

impl FrameworkHandles {
    /// Import the configured framework and resolve the compute device.
    pub fn load(py: Python<'_>, config: &FrameworkConfig) -> Result<Self, RuntimeError> {
        let unavailable = |module: &str, err: PyErr| RuntimeError::FrameworkUnavailable {
            module: module.to_string(),
            message: err.to_string(),
        };

        let framework = PyModule::import_bound(py, config.module.as_str())
            .map_err(|e| unavailable(&config.module, e))?;
        let nn = PyModule::import_bound(py, config.nn_module.as_str())
            .map_err(|e| unavailable(&config.nn_module, e))?;

        let tensor_type = framework
            .getattr("Tensor")
            .map_err(|e| unavailable(&config.module, e))?;
        let module_type = nn
            .getattr("Module")
            .map_err(|e| unavailable(&config.nn_module, e))?;

        let version = framework
            .getattr("__version__")
            .and_then(|v| v.str())
            .map(|v| v.to_string_lossy().into_owned())
            .ok();

        let device_kind = select_device(&framework, config.device)?;
        let device = framework
            .getattr("device")?
            .call1((device_kind.as_str(),))?;

        log::info!(
            ">> Backend: Running on {} ({} {})",
            device_kind.description(),
            config.module,
            version.as_deref().unwrap_or("unknown version")
        );

        Ok(Self {
            framework_name: config.module.clone(),
            framework: framework.unbind(),
            nn: nn.unbind(),
            device: device.unbind(),
            device_kind,
            tensor_type: tensor_type.unbind(),
            module_type: module_type.unbind(),
            version,
        })
    }

    pub fn framework_name(&self) -> &str {
        &self.framework_name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.device_kind
    }

    pub fn framework<'py>(&self, py: Python<'py>) -> &Bound<'py, PyModule> {
        self.framework.bind(py)
    }

    pub fn nn<'py>(&self, py: Python<'py>) -> &Bound<'py, PyModule> {
        self.nn.bind(py)
    }

    pub fn device<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.device.bind(py)
    }

    /// Whether `value` is a framework tensor.
    pub fn is_tensor(&self, value: &Bound<'_, PyAny>) -> PyResult<bool> {
        value.is_instance(self.tensor_type.bind(value.py()))
    }

    /// Whether `value` is a network module.
    pub fn is_module(&self, value: &Bound<'_, PyAny>) -> PyResult<bool> {
        value.is_instance(self.module_type.bind(value.py()))
    }
}
