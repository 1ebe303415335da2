//! HTTP handler backed by the embedded Python runtime.

use async_trait::async_trait;
use tensorpad_http::{ExecutionHandler, Result, ServerError};
use tensorpad_types::{ExecutionRequest, ExecutionResponse, RuntimeMetadata};

use crate::python::PythonExecutor;

#[async_trait]
impl ExecutionHandler for PythonExecutor {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse> {
        self.run(request)
            .await
            .map_err(|e| ServerError::execution(e.to_string()))
    }

    async fn get_metadata(&self) -> Result<RuntimeMetadata> {
        Ok(self.metadata())
    }
}
