use axum::Router;

pub mod orders;
pub mod system;

/// Router for every endpoint behind the optional API key gate.
pub fn router() -> Router {
    Router::new().nest("/orders", orders::router())
}
