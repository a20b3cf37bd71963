//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on credential endpoints (governor)
//! 5. Credential verifier, then role gate, on protected routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{CurrentAccount, require_account, require_role};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
