use serde::{Deserialize, Serialize};

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";
pub const DATABASE_CONNECTED: &str = "connected";
pub const DATABASE_DISCONNECTED: &str = "disconnected";

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339, second precision, UTC.
    pub timestamp: String,
    pub database: String,
}
