//! Common test utilities for integration tests
//!
//! Provides test server spawning and request helpers.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use leetcoach_gateway::{
    config::GatewayConfig,
    error::GatewayError,
    server::{create_app, create_router, AppState},
};

/// Test server wrapper
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawn a test server with default configuration
    pub async fn spawn() -> Self {
        Self::spawn_with_config(GatewayConfig::default()).await
    }

    /// Spawn a test server with the gateway's own routes
    pub async fn spawn_with_config(config: GatewayConfig) -> Self {
        Self::spawn_inner(config, None).await
    }

    /// Spawn a test server whose pipeline wraps `routes` instead
    pub async fn spawn_with_routes(config: GatewayConfig, routes: Router) -> Self {
        Self::spawn_inner(config, Some(routes)).await
    }

    async fn spawn_inner(mut config: GatewayConfig, routes: Option<Router>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        config.server.host = "127.0.0.1".to_string();
        config.server.port = addr.port();

        let state = AppState::new(config);
        let routes = routes.unwrap_or_else(|| create_router(state.clone()));
        let app = create_app(state.clone(), routes);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // The listener is already bound, so requests queue until serve starts
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        Self {
            addr,
            client,
            base_url: format!("http://{}", addr),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Send a GET request carrying an `Origin` header
    pub async fn get_with_origin(&self, path: &str, origin: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Origin", origin)
            .send()
            .await
            .unwrap()
    }

    /// Send a POST request with JSON body
    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Stand-in for the interview API: one working route, one that always fails
pub fn interview_routes() -> Router {
    Router::new()
        .route(
            "/api/clarify",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "agent": "ClarificationAgent",
                    "response": format!("You asked: {}", body["question"].as_str().unwrap_or("")),
                }))
            }),
        )
        .route(
            "/api/code-review",
            get(|| async {
                Err::<Json<Value>, _>(GatewayError::Internal("review model unavailable".into()))
            }),
        )
}

/// Configuration with a small rate limit
pub fn config_with_limit(requests_per_minute: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.security.rate_limiting.requests_per_minute = requests_per_minute;
    config
}

/// Assert response has a header with the given value
pub fn assert_header(response: &reqwest::Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Missing header {}", name));
    assert_eq!(value.to_str().unwrap(), expected, "Header {} mismatch", name);
}

/// Read a numeric header
pub fn header_u64(response: &reqwest::Response, name: &str) -> u64 {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Missing header {}", name))
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}

/// Assert the protective headers are present and `Server` is absent
pub fn assert_security_headers(response: &reqwest::Response) {
    assert_header(response, "x-content-type-options", "nosniff");
    assert_header(response, "x-frame-options", "DENY");
    assert_header(response, "x-xss-protection", "1; mode=block");
    assert_header(response, "referrer-policy", "strict-origin-when-cross-origin");
    assert_header(response, "content-security-policy", "default-src 'self'");
    assert!(response.headers().get("server").is_none());
}
