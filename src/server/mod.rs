//! HTTP server for the clinical event pipeline.
//!
//! This module implements the HTTP surface that:
//! - Accepts signed webhook deliveries from the EMR broker and drives them
//!   through the ingestion pipeline
//! - Provides a webhook test endpoint reporting configuration status
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts webhook deliveries (see [`webhook::webhook_handler`])
//! - `POST /webhook/test` - Echoes the body and reports signature config
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::{health_handler, webhook_test_handler};
pub use webhook::webhook_handler;

use axum::extract::DefaultBodyLimit;

use crate::config::{Config, Environment};
use crate::store::Backend;

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor. Holds the runtime
/// configuration and the injected collaborator backend; there is no other
/// cross-request state.
pub struct AppState<B> {
    inner: Arc<AppStateInner<B>>,
}

// Manual impl: AppState is Clone through the Arc whether or not B is.
impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<B> {
    config: Config,
    backend: B,
}

impl<B> AppState<B> {
    /// Creates a new `AppState` from configuration and a collaborator
    /// backend.
    pub fn new(config: Config, backend: B) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { config, backend }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// The webhook secret, if signature verification is configured.
    pub fn webhook_secret(&self) -> Option<&[u8]> {
        self.inner.config.webhook_secret.as_deref()
    }

    pub fn environment(&self) -> Environment {
        self.inner.config.environment
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<B: Backend + 'static>(app_state: AppState<B>) -> axum::Router {
    use axum::routing::{get, post};

    let body_limit = app_state.config().max_body_bytes;

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<B>))
        .route("/webhook/test", post(webhook_test_handler::<B>))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBackend;

    fn test_config(secret: Option<&[u8]>) -> Config {
        Config::new(
            "127.0.0.1:0".parse().unwrap(),
            secret.map(|s| s.to_vec()),
            Environment::Development,
        )
    }

    #[test]
    fn app_state_accessors_work() {
        let state = AppState::new(test_config(Some(b"test-secret")), InMemoryBackend::new());

        assert_eq!(state.webhook_secret(), Some(b"test-secret".as_slice()));
        assert_eq!(state.environment(), Environment::Development);
    }

    #[test]
    fn app_state_is_clone() {
        let state = AppState::new(test_config(None), InMemoryBackend::new());
        let cloned = state.clone();

        assert_eq!(cloned.webhook_secret(), None);
    }
}
