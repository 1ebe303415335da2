//! Execution scope construction and post-run introspection.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};
use serde_json::Value as JsonValue;

use super::framework::FrameworkHandles;
use super::sanitize::sanitize;

/// Names under which the runtime context is injected.
pub const TENSOR_LIB_NAME: &str = "torch";
pub const NN_NAME: &str = "nn";
pub const DEVICE_NAME: &str = "device";
pub const USER_DATA_NAME: &str = "user_data";

/// Conventionally named results read back after a run.
pub const LOSS_HISTORY_NAME: &str = "loss_history";
/// Checked in this order before falling back to a scan of the scope.
pub const MODEL_NAMES: [&str; 2] = ["net", "model"];

/// Build a fresh scope seeded with the framework handles and `user_data`.
pub fn build_scope<'py>(
    py: Python<'py>,
    handles: &FrameworkHandles,
    user_data: &str,
) -> PyResult<Bound<'py, PyDict>> {
    let scope = PyDict::new_bound(py);
    scope.set_item(TENSOR_LIB_NAME, handles.framework(py))?;
    scope.set_item(NN_NAME, handles.nn(py))?;
    scope.set_item(DEVICE_NAME, handles.device(py))?;
    scope.set_item(USER_DATA_NAME, user_data)?;
    Ok(scope)
}

/// The sanitized `loss_history`, if the scope holds a non-empty list or tuple.
pub fn extract_loss_history(
    handles: &FrameworkHandles,
    scope: &Bound<'_, PyDict>,
) -> PyResult<Option<Vec<JsonValue>>> {
    let Some(history) = scope.get_item(LOSS_HISTORY_NAME)? else {
        return Ok(None);
    };

    let items: Vec<Bound<'_, PyAny>> = if let Ok(list) = history.downcast::<PyList>() {
        list.iter().collect()
    } else if let Ok(tuple) = history.downcast::<PyTuple>() {
        tuple.iter().collect()
    } else {
        log::debug!("{} is not a sequence, ignoring", LOSS_HISTORY_NAME);
        return Ok(None);
    };

    if items.is_empty() {
        return Ok(None);
    }

    items
        .iter()
        .map(|item| sanitize(handles, item))
        .collect::<PyResult<Vec<_>>>()
        .map(Some)
}

/// Pick the model to summarize: `net`, then `model`, then the first module
/// instance in scope order.
pub fn find_model<'py>(
    handles: &FrameworkHandles,
    scope: &Bound<'py, PyDict>,
) -> PyResult<Option<Bound<'py, PyAny>>> {
    for name in MODEL_NAMES {
        if let Some(candidate) = scope.get_item(name)? {
            if handles.is_module(&candidate)? {
                return Ok(Some(candidate));
            }
        }
    }

    for (_name, value) in scope.iter() {
        if handles.is_module(&value)? {
            return Ok(Some(value));
        }
    }

    Ok(None)
}
