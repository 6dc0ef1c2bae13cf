use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use evergiven_core::DomainError;
use evergiven_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Query { operation, source } => {
            tracing::error!(operation, error = %source, "order store query failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                format!("database error in {operation}"),
            )
        }
        StoreError::Decode(msg) => {
            tracing::error!(error = %msg, "order row decode failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "decode_error", msg)
        }
        err @ StoreError::OutOfRange { .. } => {
            tracing::error!(error = %err, "order amount does not fit its column");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "numeric_overflow",
                err.to_string(),
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

/// Any body that fails to decode is the caller's fault: always 400.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
