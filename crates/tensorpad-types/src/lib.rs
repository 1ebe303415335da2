//! Wire types shared by the tensorpad execution server and its clients
//!
//! The request and response shapes here are the whole contract of the
//! `/execute` endpoint. Optional response fields are omitted from the JSON
//! body entirely rather than serialized as `null`, which is what browser
//! clients test for when deciding which visualizations to show.
//!
//! ## Example
//!
//! ```rust
//! use tensorpad_types::{ExecutionRequest, ExecutionResponse};
//!
//! let request: ExecutionRequest = serde_json::from_str(r#"{"code": "print(1)"}"#).unwrap();
//! assert_eq!(request.user_data, "");
//!
//! let response = ExecutionResponse::with_stdout("1\n");
//! let json = serde_json::to_value(&response).unwrap();
//! assert_eq!(json, serde_json::json!({"stdout": "1\n"}));
//! ```

pub mod types;

pub use types::*;
