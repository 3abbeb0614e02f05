/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT issuance and validation (access + refresh tokens)
/// - [`identity`]: bearer token → persisted user resolution
/// - [`ownership`]: per-resource owner checks (404-before-403 ordering)
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::auth::password::{hash_password, verify_password};
/// use tasknest_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret123!")?;
/// assert!(verify_password("Secret123!", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-of-at-least-32-bytes!!")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod identity;
pub mod ownership;
