/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`; the `IntoResponse` impl maps
/// each variant to its HTTP status and renders the wire format:
///
/// ```json
/// {
///   "error": {
///     "id": "3f2a...",
///     "message": "Task not found",
///     "status_code": 404,
///     "timestamp": "2025-03-01T12:00:00Z"
///   }
/// }
/// ```
///
/// Every response carries a generated opaque error id. For 500s the id is
/// the only thing the client sees; the underlying detail is logged
/// server-side against the same id for correlation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use tasknest_shared::auth::{
    identity::IdentityError, jwt::JwtError, ownership::OwnershipError, password::PasswordError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - including inactive accounts
    BadRequest(String),

    /// Unauthorized (401) - missing/invalid/expired credentials
    Unauthorized(String),

    /// Forbidden (403) - valid identity, wrong owner
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - duplicate email or label name
    Conflict(String),

    /// Unprocessable entity (422) - request validation failures
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500) - detail is logged, never returned
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Wire format: the envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Wire format: the error object
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Opaque correlation id, unique per response
    pub id: String,

    /// Human-readable message
    pub message: String,

    /// HTTP status code, repeated in the body
    pub status_code: u16,

    /// When the error was produced (RFC 3339)
    pub timestamp: String,

    /// Per-field validation errors (422 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Builds a 422 from validator's error collection
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status = self.status_code();

        let (message, details, retry_after) = match self {
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors), None)
            }
            ApiError::RateLimitExceeded {
                retry_after,
                message,
            } => (message, None, Some(retry_after)),
            ApiError::InternalError(detail) => {
                // Correlate the logged detail with the opaque id the
                // client receives
                tracing::error!(error_id = %error_id, "Internal error: {}", detail);
                ("An internal error occurred".to_string(), None, None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None, None),
        };

        let body = Json(ErrorResponse {
            error: ErrorBody {
                id: error_id,
                message,
                status_code: status.as_u16(),
                timestamp: Utc::now().to_rfc3339(),
                details,
            },
        });

        let mut response = (status, body).into_response();

        if let Some(retry_after) = retry_after {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

/// Convert sqlx errors to API errors
///
/// Unique-constraint violations become 409s with a message derived from
/// the constraint name; everything else is an opaque 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already registered".to_string());
                    }
                    if constraint.contains("labels_user_id_name") {
                        return ApiError::Conflict("Label name already exists".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert identity resolution errors to API errors (the 401/400 split)
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::AuthenticationRequired => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            IdentityError::InactiveAccount => ApiError::BadRequest("Inactive account".to_string()),
            IdentityError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

/// Convert ownership errors to API errors (404 before 403)
impl From<OwnershipError> for ApiError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            OwnershipError::Forbidden => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");

        let err = ApiError::Conflict("Label name already exists".to_string());
        assert_eq!(err.to_string(), "Conflict: Label name already exists");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized(String::new()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden(String::new()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::ValidationError(vec![]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_identity_error_mapping() {
        let err: ApiError = IdentityError::AuthenticationRequired.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        // Inactive accounts are 400, distinct from 401
        let err: ApiError = IdentityError::InactiveAccount.into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_ownership_error_mapping() {
        let err: ApiError = OwnershipError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = OwnershipError::Forbidden.into();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_into_response_shape() {
        let response = ApiError::NotFound("Task not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::RateLimitExceeded {
            retry_after: 12,
            message: "Slow down".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("Retry-After").map(|v| v.to_str().unwrap()),
            Some("12")
        );
    }
}
