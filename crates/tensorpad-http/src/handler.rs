//! Execution handler trait for the tensorpad server.

use async_trait::async_trait;
use tensorpad_types::{ExecutionRequest, ExecutionResponse, RuntimeMetadata};

use crate::error::Result;

/// Trait for backends that run submitted code.
///
/// Implementors turn an `ExecutionRequest` into an `ExecutionResponse`.
/// Exceptions raised by the submitted code belong in the response's `error`
/// field; an `Err` return is reserved for the backend itself failing.
#[async_trait]
pub trait ExecutionHandler: Send + Sync + Clone + 'static {
    /// Run the request's code and collect its output.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse>;

    /// Optional method to validate a request before execution.
    ///
    /// The default implementation accepts everything, including empty code.
    async fn validate_request(&self, _request: &ExecutionRequest) -> Result<()> {
        Ok(())
    }

    /// Describe the interpreter and framework behind this handler.
    async fn get_metadata(&self) -> Result<RuntimeMetadata> {
        Ok(RuntimeMetadata {
            framework: "unknown".to_string(),
            framework_version: None,
            device: "unknown".to_string(),
            python_version: "unknown".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
