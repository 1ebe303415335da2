//! Request, response and metadata types for the execution endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A snippet to run, plus an optional free-form data string exposed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to execute.
    pub code: String,
    /// Auxiliary input, visible to the snippet as `user_data`.
    #[serde(default)]
    pub user_data: String,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            user_data: String::new(),
        }
    }

    pub fn with_user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = user_data.into();
        self
    }
}

/// One immediate child of an inspected network module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Class name of the layer, e.g. `Linear` or `Conv2d`.
    #[serde(rename = "type")]
    pub layer_type: String,
    /// Display string of recognized constructor parameters, e.g. `in=10, out=5`.
    pub params: String,
}

impl LayerSummary {
    pub fn new(layer_type: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            layer_type: layer_type.into(),
            params: params.into(),
        }
    }
}

/// Result of one execution.
///
/// `stdout` is always present. `loss_history` and `model_structure` are only
/// populated after the snippet ran to completion; `error` carries the
/// exception type, message and traceback when it did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub stdout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_history: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_structure: Option<Vec<LayerSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResponse {
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// A response for a run that raised.
    pub fn failed(stdout: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Description of the interpreter and framework backing the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    /// Import name of the tensor framework, e.g. `torch`.
    pub framework: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_version: Option<String>,
    /// Selected compute device, e.g. `cuda`.
    pub device: String,
    pub python_version: String,
    /// Version of the service itself.
    pub version: String,
}
