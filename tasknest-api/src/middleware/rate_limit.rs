/// Per-user rate limiting middleware
///
/// Token bucket per authenticated user with state in Redis, so the limit
/// holds across server instances. Tokens refill continuously at
/// `rate_limit_per_minute / 60` per second; each request consumes one.
///
/// # Behavior
///
/// - No Redis configured, or rate limiting disabled → pass-through.
/// - Redis unreachable mid-flight → fail open (the limiter protects
///   capacity, it is not a security boundary).
/// - Budget exhausted → 429 with a `Retry-After` header.
///
/// # Storage
///
/// Keys: `ratelimit:user:{user_id}`, hash of `tokens` + `last_refill`,
/// 2-minute TTL for auto-cleanup. Refill and consume are a single Lua
/// script so concurrent requests cannot double-spend.
///
/// # Headers
///
/// Successful responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining`
/// and `X-RateLimit-Reset`.

use axum::{
    extract::{Extension, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    app::{AppState, CurrentUser},
    error::ApiError,
};

/// Atomic refill-and-consume. Returns {allowed, remaining, retry_after}.
const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    last_refill = now
end

local elapsed = now - last_refill
tokens = math.min(capacity, tokens + (elapsed * refill_rate))

if tokens >= 1 then
    tokens = tokens - 1
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 120)
    return {1, math.floor(tokens), 0}
else
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 120)
    return {0, 0, math.ceil((1 - tokens) / refill_rate)}
end
"#;

/// Rate limiting middleware
///
/// Must run after the auth layer: it keys buckets on the resolved user.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(manager) = state.redis.clone() else {
        return Ok(next.run(request).await);
    };

    if !state.config.redis.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let limit = state.config.redis.rate_limit_per_minute;
    let refill_rate = f64::from(limit) / 60.0;
    let key = format!("ratelimit:user:{}", user.0.id);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut conn = manager;
    let script = redis::Script::new(TOKEN_BUCKET_SCRIPT);
    let outcome: Result<(i64, i64, i64), redis::RedisError> = script
        .key(&key)
        .arg(limit)
        .arg(refill_rate)
        .arg(now)
        .invoke_async(&mut conn)
        .await;

    let (allowed, remaining, retry_after) = match outcome {
        Ok(values) => values,
        Err(e) => {
            // Fail open: a degraded Redis must not take the API down
            tracing::warn!(error = %e, "Rate limit check failed, allowing request");
            return Ok(next.run(request).await);
        }
    };

    if allowed != 1 {
        return Err(ApiError::RateLimitExceeded {
            retry_after: retry_after.max(1) as u64,
            message: "Rate limit exceeded".to_string(),
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&(now + 60).to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }

    Ok(response)
}
