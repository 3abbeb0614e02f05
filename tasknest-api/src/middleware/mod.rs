/// Middleware modules for the API server
///
/// - `security`: OWASP response headers
/// - `rate_limit`: per-user token bucket (Redis-backed, fail-open)

pub mod rate_limit;
pub mod security;
