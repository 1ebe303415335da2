//! HTTP front end for running code snippets against an execution backend
//!
//! This crate exposes a single execution endpoint plus health and runtime
//! information routes. The server is generic over an [`ExecutionHandler`], so
//! the interpreter lives in another crate and tests can substitute a mock.
//! Every handled execution answers with status 200; failures of the submitted
//! code travel inside the response body.

pub mod error;
pub mod handler;

pub use error::{Result, ServerError};
pub use handler::ExecutionHandler;

pub use tensorpad_types::{ExecutionRequest, ExecutionResponse, LayerSummary, RuntimeMetadata};

use axum::extract::{DefaultBodyLimit, Json as AxumJson, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            enable_cors: true,
            cors_origins: None, // Allow any origin
            max_body_size: 1024 * 1024, // 1MB
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address: {}", e)))?;
        Ok(self)
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Set allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Enable or disable request logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState<T: ExecutionHandler> {
    pub handler: T,
}

type HandlerError = (StatusCode, Json<serde_json::Value>);

fn error_body(status: StatusCode, message: &str, error: &ServerError) -> HandlerError {
    (
        status,
        Json(json!({
            "error": message,
            "error_type": error.error_type(),
            "details": error.to_string(),
            "timestamp": chrono::Utc::now()
        })),
    )
}

/// Handler for the /execute POST endpoint.
async fn execute_handler<T: ExecutionHandler>(
    State(app_state): State<AppState<T>>,
    AxumJson(request): AxumJson<ExecutionRequest>,
) -> std::result::Result<Json<ExecutionResponse>, HandlerError> {
    log::info!(
        "Received execution request ({} bytes of code, {} bytes of user data)",
        request.code.len(),
        request.user_data.len()
    );

    if let Err(e) = app_state.handler.validate_request(&request).await {
        log::warn!("Request validation failed: {}", e);
        return Err(error_body(StatusCode::BAD_REQUEST, "Invalid request", &e));
    }

    match app_state.handler.execute(request).await {
        Ok(response) => {
            match &response.error {
                Some(error) => log::info!(
                    "Execution raised: {}",
                    error.lines().next().unwrap_or_default()
                ),
                None => log::info!(
                    "Execution finished ({} bytes of stdout)",
                    response.stdout.len()
                ),
            }
            Ok(Json(response))
        }
        Err(e) => {
            log::error!("Execution backend failed: {}", e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Err(error_body(status, "Execution backend failed", &e))
        }
    }
}

/// Handler for the /runtime GET endpoint.
async fn runtime_handler<T: ExecutionHandler>(
    State(app_state): State<AppState<T>>,
) -> std::result::Result<Json<RuntimeMetadata>, HandlerError> {
    log::debug!("Received runtime metadata request");

    app_state.handler.get_metadata().await.map(Json).map_err(|e| {
        log::error!("Failed to get runtime metadata: {}", e);
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get runtime metadata",
            &e,
        )
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();

    // Health probes are noisy
    if uri.path() == "/health" {
        log::debug!("Request {} {} {}", request_id, method, uri);
    } else {
        log::info!("Request {} {} {}", request_id, method, uri);
    }

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    if uri.path() == "/health" {
        log::debug!("Response {} {} in {:?}", request_id, response.status(), duration);
    } else {
        log::info!("Response {} {} in {:?}", request_id, response.status(), duration);
    }

    response
}

/// The tensorpad HTTP server.
pub struct TensorpadServer<T: ExecutionHandler> {
    handler: T,
    config: ServerConfig,
}

impl<T: ExecutionHandler> TensorpadServer<T> {
    /// Create a new server with the given handler and default configuration.
    pub fn new(handler: T) -> Self {
        Self {
            handler,
            config: ServerConfig::default(),
        }
    }

    /// Create a new server with custom configuration.
    pub fn with_config(handler: T, config: ServerConfig) -> Self {
        Self { handler, config }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            handler: self.handler.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/runtime", get(runtime_handler::<T>))
            .route("/execute", post(execute_handler::<T>))
            .with_state(state)
            .layer(DefaultBodyLimit::max(self.config.max_body_size));

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(log_requests));
        }

        router = router.layer(TraceLayer::new_for_http());

        // CORS goes outermost so preflight requests never reach the routes
        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<axum::http::HeaderValue>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => {
                        log::warn!("Invalid CORS origin list, falling back to permissive CORS");
                        CorsLayer::permissive()
                    }
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided shutdown signal is received.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = self.bind().await?;

        log::info!(
            "tensorpad server starting on {} with graceful shutdown",
            self.config.bind_addr
        );
        log::info!("Execute endpoint: http://{}/execute", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("tensorpad server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt; // for `oneshot`

    #[derive(Clone)]
    struct MockHandler {
        seen: Arc<Mutex<Vec<ExecutionRequest>>>,
        fail_backend: bool,
    }

    impl MockHandler {
        fn new() -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                fail_backend: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_backend: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ExecutionHandler for MockHandler {
        async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse> {
            if self.fail_backend {
                return Err(ServerError::execution("worker panicked"));
            }
            self.seen.lock().unwrap().push(request.clone());
            if request.code.contains("raise") {
                return Ok(ExecutionResponse::failed(
                    "before\n",
                    "ValueError: boom\nTraceback (most recent call last):\n",
                ));
            }
            Ok(ExecutionResponse::with_stdout(format!(
                "{}\n",
                request.user_data
            )))
        }

        async fn validate_request(&self, request: &ExecutionRequest) -> Result<()> {
            if request.code.contains("\0") {
                return Err(ServerError::invalid_request("code contains a NUL byte"));
            }
            Ok(())
        }
    }

    fn post_execute(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/execute")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_execute_endpoint_returns_handler_response() {
        let handler = MockHandler::new();
        let seen = handler.seen.clone();
        let app = TensorpadServer::new(handler).build_router();

        let response = app
            .oneshot(post_execute(json!({"code": "print(user_data)", "user_data": "hello"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({"stdout": "hello\n"}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code, "print(user_data)");
    }

    #[tokio::test]
    async fn test_execute_endpoint_defaults_user_data() {
        let handler = MockHandler::new();
        let seen = handler.seen.clone();
        let app = TensorpadServer::new(handler).build_router();

        let response = app
            .oneshot(post_execute(json!({"code": "pass"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(seen.lock().unwrap()[0].user_data, "");
    }

    #[tokio::test]
    async fn test_execution_error_is_reported_with_ok_status() {
        let app = TensorpadServer::new(MockHandler::new()).build_router();

        let response = app
            .oneshot(post_execute(json!({"code": "raise ValueError('boom')"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["stdout"], "before\n");
        assert!(body["error"].as_str().unwrap().starts_with("ValueError: boom"));
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected_before_handler() {
        let handler = MockHandler::new();
        let seen = handler.seen.clone();
        let app = TensorpadServer::new(handler).build_router();

        let response = app
            .oneshot(post_execute(json!({"user_data": "hello"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_returns_bad_request() {
        let app = TensorpadServer::new(MockHandler::new()).build_router();

        let response = app
            .oneshot(post_execute(json!({"code": "print(1)\u{0}"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error_type"], "invalid_request");
    }

    #[tokio::test]
    async fn test_backend_failure_returns_server_error() {
        let app = TensorpadServer::new(MockHandler::failing()).build_router();

        let response = app
            .oneshot(post_execute(json!({"code": "print(1)"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error_type"], "execution_error");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = TensorpadServer::new(MockHandler::new()).build_router();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/execute")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_health_and_runtime_endpoints() {
        let app = TensorpadServer::new(MockHandler::new()).build_router();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");

        let response = app
            .oneshot(Request::builder().uri("/runtime").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["device"], "unknown");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = ServerConfig::new().with_max_body_size(64);
        let server = TensorpadServer::with_config(MockHandler::new(), config);
        assert_eq!(server.config().max_body_size, 64);

        let response = server
            .build_router()
            .oneshot(post_execute(json!({"code": "x".repeat(256)})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::new()
            .with_bind_addr_str("127.0.0.1:9000")
            .unwrap()
            .with_cors(false)
            .with_max_body_size(42);
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(!config.enable_cors);
        assert_eq!(config.max_body_size, 42);
        assert!(ServerConfig::new().with_bind_addr_str("nope").is_err());
    }
}
