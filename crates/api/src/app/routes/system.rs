use std::sync::Arc;

use axum::{extract::Extension, Json};
use chrono::{SecondsFormat, Utc};

use crate::app::dto::{self, HealthResponse};
use crate::app::services::AppServices;

/// Liveness report. Always 200; a failed database probe shows up in the body.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    let (status, database) = match services.database().ping().await {
        Ok(()) => (dto::STATUS_HEALTHY, dto::DATABASE_CONNECTED),
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            (dto::STATUS_UNHEALTHY, dto::DATABASE_DISCONNECTED)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        database: database.to_string(),
    })
}
