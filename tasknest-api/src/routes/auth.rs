/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - register and get tokens
/// - `POST /v1/auth/login` - login and get tokens
/// - `POST /v1/auth/refresh` - exchange refresh token for a new access token
/// - `GET  /v1/auth/me` - current user profile
/// - `PUT  /v1/auth/me` - update profile (name, email, password)

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use tasknest_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, UpdateUser, User},
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (strength-checked separately)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token pair returned by register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// User id
    pub user_id: Uuid,

    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: String,

    /// Always "bearer"
    pub token_type: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,

    /// Always "bearer"
    pub token_type: String,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    /// New password (strength-checked)
    pub password: Option<String>,
}

/// Public user profile
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Issues the access/refresh pair for a user, using configured TTLs
fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<(String, String), ApiError> {
    let access_claims = jwt::Claims::with_expiration(
        user_id,
        jwt::TokenType::Access,
        Duration::minutes(state.config.jwt.access_ttl_minutes),
    );
    let refresh_claims = jwt::Claims::with_expiration(
        user_id,
        jwt::TokenType::Refresh,
        Duration::days(state.config.jwt.refresh_ttl_days),
    );

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok((access_token, refresh_token))
}

/// Registers a new user account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {"email": "alice@example.com", "password": "Secret123!", "name": "Alice"}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: invalid email or weak password
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;

    password::validate_password_strength(&req.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    // Pre-flight check for a friendlier error; the unique index still
    // backstops concurrent registrations (mapped to 409 by From<sqlx::Error>)
    if User::is_email_taken(&state.db, &req.email, None).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        },
    )
    .await?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            user_id: user.id,
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }),
    ))
}

/// Logs a user in
///
/// Unknown email and wrong password produce the same 401 so the endpoint
/// does not reveal which emails are registered.
///
/// # Errors
///
/// - `401 Unauthorized`: bad credentials
/// - `400 Bad Request`: account is deactivated
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate().map_err(ApiError::from_validation)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Incorrect email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Incorrect email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive account".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
    }))
}

/// Exchanges a refresh token for a new access token
///
/// The subject must still exist and be active; a refresh token does not
/// outlive account deactivation.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or user gone
/// - `400 Bad Request`: account is deactivated
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive account".to_string()));
    }

    let access_claims = jwt::Claims::with_expiration(
        user.id,
        jwt::TokenType::Access,
        Duration::minutes(state.config.jwt.access_ttl_minutes),
    );
    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Returns the authenticated user's profile
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(user.0))
}

/// Updates the authenticated user's profile
///
/// # Errors
///
/// - `409 Conflict`: new email belongs to another account
/// - `422 Unprocessable Entity`: invalid email or weak password
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate().map_err(ApiError::from_validation)?;

    let user = user.0;

    if let Some(ref email) = req.email {
        if User::is_email_taken(&state.db, email, Some(user.id)).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
    }

    let password_hash = match req.password {
        Some(ref new_password) => {
            password::validate_password_strength(new_password).map_err(|message| {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "password".to_string(),
                    message,
                }])
            })?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let updated = User::update(
        &state.db,
        user.id,
        UpdateUser {
            email: req.email,
            password_hash,
            name: req.name.map(Some),
            is_active: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(updated)))
}
