//! Request ID middleware for request tracing and correlation.
//!
//! Uses the `x-request-id` sent by an upstream proxy when it looks sane,
//! otherwise generates a UUID v4. The ID is recorded in the request span,
//! tagged on the Sentry scope and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID that is passed through unchanged.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Pick the upstream ID if it is short, printable ASCII; otherwise mint one.
fn resolve_request_id(upstream: Option<&HeaderValue>) -> String {
    upstream
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LENGTH
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(request.headers().get(REQUEST_ID_HEADER));

    Span::current().record("request_id", request_id.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_kept() {
        let header = HeaderValue::from_static("cf-1234-abcd");
        assert_eq!(resolve_request_id(Some(&header)), "cf-1234-abcd");
    }

    #[test]
    fn test_missing_or_odd_id_replaced() {
        let generated = resolve_request_id(None);
        assert!(Uuid::parse_str(&generated).is_ok());

        let spaced = HeaderValue::from_static("has spaces inside");
        assert!(Uuid::parse_str(&resolve_request_id(Some(&spaced))).is_ok());

        let long = HeaderValue::from_str(&"a".repeat(200)).ok();
        assert!(Uuid::parse_str(&resolve_request_id(long.as_ref())).is_ok());
    }
}
