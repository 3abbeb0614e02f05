/// Per-request identity resolution
///
/// Turns a bearer token into a persisted [`User`] record. This is the only
/// place the 401/400 split is decided:
///
/// - no token, unverifiable token, or a subject with no user row →
///   [`IdentityError::AuthenticationRequired`] (401)
/// - a real user whose account is deactivated →
///   [`IdentityError::InactiveAccount`] (400)
///
/// The token subject is always a user id. Lookup is by id only.

use sqlx::PgPool;

use super::jwt;
use crate::models::user::User;

/// Error type for identity resolution
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Missing, expired, tampered, or malformed token, or no such user
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Valid token for a deactivated account
    #[error("Inactive account")]
    InactiveAccount,

    /// Database error during user lookup
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolves a bearer token to its user
///
/// Read-only: no side effects on the user record.
///
/// # Errors
///
/// - `AuthenticationRequired` if the token does not verify or the subject
///   no longer exists
/// - `InactiveAccount` if the user exists but is deactivated
/// - `Database` if the lookup itself fails
///
/// # Example
///
/// ```no_run
/// # use tasknest_shared::auth::identity::resolve_user;
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool, token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let user = resolve_user(&pool, token, "jwt-secret").await?;
/// println!("authenticated as {}", user.email);
/// # Ok(())
/// # }
/// ```
pub async fn resolve_user(pool: &PgPool, token: &str, secret: &str) -> Result<User, IdentityError> {
    let user_id =
        jwt::verify_subject(token, secret).ok_or(IdentityError::AuthenticationRequired)?;

    let user = User::find_by_id(pool, user_id)
        .await?
        .ok_or(IdentityError::AuthenticationRequired)?;

    if !user.is_active {
        return Err(IdentityError::InactiveAccount);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            IdentityError::AuthenticationRequired.to_string(),
            "Authentication required"
        );
        assert_eq!(IdentityError::InactiveAccount.to_string(), "Inactive account");
    }

    // resolve_user paths that touch the database are covered by the
    // integration tests in tasknest-api/tests/.
}
