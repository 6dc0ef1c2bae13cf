//! HTTP API application wiring (Axum router + service wiring).
//!
//! This folder is structured like:
//! - `services.rs`: storage wiring (backend selection, schema, order store)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: response DTOs that are not domain types
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use evergiven_infra::DbError;

use crate::config::Config;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Selects and verifies the database, makes sure the order table exists, and
/// only then returns a router. Any failure here must stop the process.
pub async fn build_app(config: &Config) -> Result<Router, DbError> {
    let services = services::build_services(&config.database_url).await?;
    Ok(router(Arc::new(services), config.api_key.clone()))
}

/// Assemble routes and middleware around already-initialized services.
pub fn router(services: Arc<AppServices>, api_key: Option<String>) -> Router {
    let mut protected = routes::router();

    // No key configured: the gate is not installed at all.
    if let Some(api_key) = api_key {
        tracing::info!("API key authentication enabled");
        protected = protected.layer(axum::middleware::from_fn_with_state(
            middleware::ApiKeyState::new(api_key),
            middleware::api_key_middleware,
        ));
    }

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_id))
                .layer(axum::middleware::from_fn(middleware::real_ip))
                .layer(axum::middleware::from_fn(middleware::request_log))
                .layer(axum::middleware::from_fn(middleware::catch_panic))
                .layer(axum::middleware::from_fn(middleware::cors)),
        )
}
