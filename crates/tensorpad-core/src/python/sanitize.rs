//! Conversion of Python values into JSON.
//!
//! Tensors become plain numbers (single element) or nested lists, sequences
//! and mappings are converted element-wise, and objects exposing `item()`
//! (numpy scalars and the like) are reduced to that scalar. Anything else is
//! represented by its `str()` text. Nesting deeper than [`MAX_DEPTH`] raises
//! `RecursionError`, which the executor reports like any other failure.

use pyo3::exceptions::PyRecursionError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyString, PyTuple};
use serde_json::{Map, Number, Value as JsonValue};

use super::framework::FrameworkHandles;

/// Deepest nesting converted before giving up.
///
/// Conversion recurses on the native stack of a blocking worker thread,
/// which is far smaller than what Python's own recursion limit assumes.
pub const MAX_DEPTH: usize = 256;

/// Convert `value` into a JSON-representable equivalent.
pub fn sanitize(handles: &FrameworkHandles, value: &Bound<'_, PyAny>) -> PyResult<JsonValue> {
    sanitize_nested(handles, value, 0)
}

fn sanitize_nested(
    handles: &FrameworkHandles,
    value: &Bound<'_, PyAny>,
    depth: usize,
) -> PyResult<JsonValue> {
    if depth > MAX_DEPTH {
        return Err(PyRecursionError::new_err(format!(
            "maximum nesting depth ({}) exceeded while converting results to JSON",
            MAX_DEPTH
        )));
    }

    if handles.is_tensor(value)? {
        let numel: usize = value.call_method0("numel")?.extract()?;
        let plain = if numel == 1 {
            value.call_method0("item")?
        } else {
            value.call_method0("tolist")?
        };
        return sanitize_nested(handles, &plain, depth + 1);
    }

    if value.is_none() {
        return Ok(JsonValue::Null);
    }

    // bool is a subclass of int, check it first
    if let Ok(flag) = value.downcast::<PyBool>() {
        return Ok(JsonValue::Bool(flag.is_true()));
    }

    if value.is_instance_of::<PyLong>() {
        return Ok(int_to_json(value));
    }

    if let Ok(float) = value.downcast::<PyFloat>() {
        return Ok(float_to_json(float.value()));
    }

    if let Ok(text) = value.downcast::<PyString>() {
        return Ok(JsonValue::String(text.to_string_lossy().into_owned()));
    }

    if let Ok(list) = value.downcast::<PyList>() {
        return list
            .iter()
            .map(|item| sanitize_nested(handles, &item, depth + 1))
            .collect::<PyResult<Vec<_>>>()
            .map(JsonValue::Array);
    }

    if let Ok(tuple) = value.downcast::<PyTuple>() {
        return tuple
            .iter()
            .map(|item| sanitize_nested(handles, &item, depth + 1))
            .collect::<PyResult<Vec<_>>>()
            .map(JsonValue::Array);
    }

    if let Ok(dict) = value.downcast::<PyDict>() {
        let mut object = Map::new();
        for (key, item) in dict.iter() {
            let key = match key.downcast::<PyString>() {
                Ok(text) => text.to_string_lossy().into_owned(),
                Err(_) => key.str()?.to_string_lossy().into_owned(),
            };
            object.insert(key, sanitize_nested(handles, &item, depth + 1)?);
        }
        return Ok(JsonValue::Object(object));
    }

    // A plain attribute that happens to be called `item` is not a scalar accessor
    if let Ok(item) = value.getattr("item") {
        if item.is_callable() {
            return sanitize_nested(handles, &item.call0()?, depth + 1);
        }
    }

    Ok(JsonValue::String(value.str()?.to_string_lossy().into_owned()))
}

fn int_to_json(value: &Bound<'_, PyAny>) -> JsonValue {
    if let Ok(int) = value.extract::<i64>() {
        return JsonValue::Number(int.into());
    }
    if let Ok(int) = value.extract::<u64>() {
        return JsonValue::Number(int.into());
    }
    // Beyond 64 bits: lossy, like JSON parsers on the other end anyway
    value
        .extract::<f64>()
        .map(float_to_json)
        .unwrap_or(JsonValue::Null)
}

/// NaN and infinities have no JSON form.
fn float_to_json(value: f64) -> JsonValue {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
