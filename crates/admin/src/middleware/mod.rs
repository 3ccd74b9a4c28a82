//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers (embedded CSP)
//! 4. Session layer (tower-sessions with `PostgreSQL` store, OAuth state only)
//!
//! Authentication is per handler through the [`ShopSession`] extractor.

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{ShopAuthRejection, ShopSession, bounce_url};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
