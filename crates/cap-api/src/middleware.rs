//! captionary/crates/cap-api/src/middleware.rs
//!
//! Shared middleware for logging and cross-origin access.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Returns the standard request logger:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// CORS policy for the JSON API. The original frontend is served from a
/// different origin, so this stays permissive.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .max_age(3600)
}
