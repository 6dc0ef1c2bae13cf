/// Per-request context attached by the request-id middleware.
///
/// Handlers and later middleware read it from request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Resolved caller address, set by the real-IP middleware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClientIp(pub std::net::IpAddr);
