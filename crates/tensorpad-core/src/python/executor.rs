//! Executes submitted snippets in the embedded interpreter.
//!
//! Submitted code runs with the full privileges of the service process. There
//! is no isolation, no timeout and no resource ceiling: a snippet can touch the
//! filesystem, open sockets, exhaust memory or loop forever. Only expose the
//! service to people who could run that code on the host anyway.

use pyo3::prelude::*;
use pyo3::types::PyString;
use std::sync::{Arc, Mutex, PoisonError};
use tensorpad_types::{ExecutionRequest, ExecutionResponse, RuntimeMetadata};

use super::capture::StdoutCapture;
use super::framework::{extend_sys_path, FrameworkHandles};
use super::scope::{build_scope, extract_loss_history, find_model};
use super::structure::extract_model_structure;
use crate::config::TensorpadConfig;
use crate::errors::RuntimeError;

/// Serializes executions across the whole process.
///
/// Output capture swaps `sys.stdout`, which every interpreter thread shares,
/// and executed code may release the GIL mid-run. Without this lock two
/// overlapping runs would write into each other's buffers.
static EXECUTION_LOCK: Mutex<()> = Mutex::new(());

/// Runs snippets against the shared framework handles.
///
/// Cloning is cheap; clones share the same handles.
#[derive(Clone)]
pub struct PythonExecutor {
    handles: Arc<FrameworkHandles>,
    python_version: String,
}

impl PythonExecutor {
    /// Start the interpreter, import the framework and select the device.
    pub fn initialize(config: &TensorpadConfig) -> Result<Self, RuntimeError> {
        Python::with_gil(|py| {
            extend_sys_path(py, &config.python.extra_paths)?;

            let python_version: String = py.import_bound("sys")?.getattr("version")?.extract()?;
            let python_version = python_version
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            log::debug!("Embedded Python {}", python_version);

            let handles = FrameworkHandles::load(py, &config.framework)?;
            Ok(Self {
                handles: Arc::new(handles),
                python_version,
            })
        })
    }

    pub fn handles(&self) -> &FrameworkHandles {
        &self.handles
    }

    pub fn metadata(&self) -> RuntimeMetadata {
        RuntimeMetadata {
            framework: self.handles.framework_name().to_string(),
            framework_version: self.handles.version().map(str::to_string),
            device: self.handles.device_kind().to_string(),
            python_version: self.python_version.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Run a request on a blocking worker thread.
    pub async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResponse, RuntimeError> {
        let executor = self.clone();
        tokio::task::spawn_blocking(move || executor.run_blocking(&request))
            .await
            .map_err(|e| RuntimeError::InternalError(format!("Execution worker failed: {}", e)))?
    }

    /// Run a request on the current thread, waiting for any execution in flight.
    ///
    /// Exceptions raised by the snippet are reported in the response; an `Err`
    /// means the interpreter itself misbehaved.
    pub fn run_blocking(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, RuntimeError> {
        let _guard = EXECUTION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        Python::with_gil(|py| self.run_with_gil(py, request))
    }

    fn run_with_gil(
        &self,
        py: Python<'_>,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResponse, RuntimeError> {
        let scope = build_scope(py, &self.handles, &request.user_data)?;

        let capture = StdoutCapture::start(py)?;
        let outcome = py.run_bound(&request.code, Some(&scope), Some(&scope));
        let stdout = capture.finish()?;

        if let Err(err) = outcome {
            log::debug!("Snippet raised: {}", err);
            return Ok(ExecutionResponse::failed(stdout, format_exception(py, &err)));
        }

        let mut response = ExecutionResponse::with_stdout(stdout);

        let introspection = extract_loss_history(&self.handles, &scope).and_then(|loss_history| {
            let model_structure = match find_model(&self.handles, &scope)? {
                Some(model) => Some(extract_model_structure(&model)?),
                None => None,
            };
            Ok((loss_history, model_structure))
        });

        match introspection {
            Ok((loss_history, model_structure)) => {
                response.loss_history = loss_history;
                response.model_structure = model_structure;
                Ok(response)
            }
            Err(err) => {
                log::warn!("Inspecting the execution scope failed: {}", err);
                Ok(ExecutionResponse::failed(
                    response.stdout,
                    format_exception(py, &err),
                ))
            }
        }
    }
}

/// `"<Type>: <message>\n<traceback>"`, the traceback as Python prints it.
pub fn format_exception(py: Python<'_>, err: &PyErr) -> String {
    let type_name = err
        .get_type_bound(py)
        .getattr("__name__")
        .and_then(|name| name.extract::<String>())
        .unwrap_or_else(|_| "Exception".to_string());
    let message = err
        .value_bound(py)
        .str()
        .map(|text| text.to_string_lossy().into_owned())
        .unwrap_or_default();
    let traceback = format_traceback(py, err).unwrap_or_else(|e| {
        log::debug!("Could not format traceback: {}", e);
        String::new()
    });

    format!("{}: {}\n{}", type_name, message, traceback)
}

fn format_traceback(py: Python<'_>, err: &PyErr) -> PyResult<String> {
    let lines = py.import_bound("traceback")?.call_method1(
        "format_exception",
        (
            err.get_type_bound(py),
            err.value_bound(py),
            err.traceback_bound(py),
        ),
    )?;
    PyString::new_bound(py, "")
        .call_method1("join", (lines,))?
        .extract()
}
