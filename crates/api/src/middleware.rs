//! Request pipeline stages applied ahead of routing.
//!
//! Outermost first: request id → real IP → request log → panic recovery →
//! CORS → (optional) API key gate → handlers.

use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::{
        header::{self, HeaderName, HeaderValue},
        HeaderMap, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::app::errors;
use crate::context::{ClientIp, RequestContext};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
pub const REAL_IP_HEADER: HeaderName = HeaderName::from_static("x-real-ip");
pub const FORWARDED_FOR_HEADER: HeaderName = HeaderName::from_static("x-forwarded-for");

const CORS_ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const CORS_ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Type, X-CSRF-Token, X-API-Key";
const CORS_EXPOSED_HEADERS: &str = "Link";
const CORS_MAX_AGE_SECS: &str = "300";

type Request = axum::http::Request<axum::body::Body>;

/// Tag every request with an id (inbound `x-request-id` or a fresh UUIDv7)
/// and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    req.extensions_mut().insert(RequestContext::new(id.clone()));
    let mut res = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Record the caller's address as [`ClientIp`].
///
/// `X-Real-IP` first, then the left-most `X-Forwarded-For` entry, then the TCP
/// peer (needs `into_make_service_with_connect_info`). Header values that do
/// not parse as an IP are ignored.
pub async fn real_ip(mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(ip) = forwarded_ip(req.headers()).or(peer) {
        req.extensions_mut().insert(ClientIp(ip));
    }
    next.run(req).await
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    header_ip(&REAL_IP_HEADER).or_else(|| header_ip(&FORWARDED_FOR_HEADER))
}

/// One structured log line per request, inside a span carrying the request id
/// and client address.
pub async fn request_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|c| c.request_id().to_string())
        .unwrap_or_default();
    let remote_addr = req
        .extensions()
        .get::<ClientIp>()
        .map(|ClientIp(ip)| ip.to_string())
        .unwrap_or_default();

    let span = tracing::info_span!("request", %method, %path, %request_id, %remote_addr);
    async move {
        let started = Instant::now();
        let res = next.run(req).await;
        tracing::info!(
            status = res.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        res
    }
    .instrument(span)
    .await
}

/// Turn a panicking handler into a 500 instead of a dropped connection.
pub async fn catch_panic(req: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(panic = %detail, "handler panicked");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error",
            )
        }
    }
}

/// Permissive CORS: any origin (echoed back), credentials allowed.
///
/// Preflight requests are answered here and never reach routing or auth.
pub async fn cors(req: Request, next: Next) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let Some(origin) = origin else {
        return next.run(req).await;
    };

    let is_preflight = req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    if is_preflight {
        let mut res = StatusCode::NO_CONTENT.into_response();
        let headers = res.headers_mut();
        apply_cors_origin(headers, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(CORS_MAX_AGE_SECS),
        );
        return res;
    }

    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    apply_cors_origin(headers, origin);
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(CORS_EXPOSED_HEADERS),
    );
    res
}

fn apply_cors_origin(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}

#[derive(Clone)]
pub struct ApiKeyState {
    api_key: Arc<str>,
}

impl ApiKeyState {
    pub fn new(api_key: impl Into<Arc<str>>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

/// Shared-secret gate. Installed only when an API key is configured.
pub async fn api_key_middleware(
    State(state): State<ApiKeyState>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = extract_api_key(req.headers()).is_some_and(|k| k == &*state.api_key);
    if !authorized {
        tracing::warn!(path = %req.uri().path(), "rejected request without valid API key");
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized");
    }

    next.run(req).await
}

/// `X-API-Key` wins; otherwise fall back to `Authorization: Bearer <key>`.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    let from_header = headers
        .get(&API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    if from_header.is_some() {
        return from_header;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
