//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (records into the span opened by 2)
//! 4. Security headers
//! 5. Rate limiting (governor), per route group
//!
//! Authentication is not a layer: handlers take [`CurrentUser`] or
//! [`RequireAdmin`] as extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{CurrentUser, RequireAdmin};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
