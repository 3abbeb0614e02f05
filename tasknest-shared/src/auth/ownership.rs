/// Per-resource ownership checks
///
/// Tasks and labels belong to exactly one user, and only that user may
/// read or mutate them. Every handler that loads a resource by id runs it
/// through [`require_found_and_owned`], which fixes the check order:
///
/// 1. resource absent → [`OwnershipError::NotFound`] (404)
/// 2. resource present but owned by someone else →
///    [`OwnershipError::Forbidden`] (403)
///
/// A missing resource is never reported as Forbidden: existence is decided
/// before ownership is ever compared.
///
/// # Example
///
/// ```
/// use tasknest_shared::auth::ownership::{require_found_and_owned, OwnedResource, OwnershipError};
/// use uuid::Uuid;
///
/// struct Note { owner: Uuid }
/// impl OwnedResource for Note {
///     fn owner_id(&self) -> Uuid { self.owner }
/// }
///
/// let me = Uuid::new_v4();
/// let note = Note { owner: me };
///
/// assert!(require_found_and_owned(Some(note), me).is_ok());
/// assert!(matches!(
///     require_found_and_owned::<Note>(None, me),
///     Err(OwnershipError::NotFound)
/// ));
/// ```

use uuid::Uuid;

/// A resource with a single owning user
pub trait OwnedResource {
    /// Owning user id stored on the resource
    fn owner_id(&self) -> Uuid;
}

/// Error type for ownership checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// Resource does not exist
    #[error("Resource not found")]
    NotFound,

    /// Resource exists but belongs to another user
    #[error("Not authorized to access this resource")]
    Forbidden,
}

/// Checks that `user_id` owns the resource
///
/// # Errors
///
/// Returns `OwnershipError::Forbidden` on owner mismatch
pub fn authorize<R: OwnedResource>(resource: &R, user_id: Uuid) -> Result<(), OwnershipError> {
    if resource.owner_id() != user_id {
        return Err(OwnershipError::Forbidden);
    }

    Ok(())
}

/// Unwraps a lookup result and checks ownership, in that order
///
/// Takes the `Option` a `find_by_id` returns. `None` is NotFound; a
/// present resource with the wrong owner is Forbidden.
pub fn require_found_and_owned<R: OwnedResource>(
    resource: Option<R>,
    user_id: Uuid,
) -> Result<R, OwnershipError> {
    let resource = resource.ok_or(OwnershipError::NotFound)?;
    authorize(&resource, user_id)?;
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owned {
        owner: Uuid,
    }

    impl OwnedResource for Owned {
        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    #[test]
    fn test_authorize_owner_allowed() {
        let me = Uuid::new_v4();
        let resource = Owned { owner: me };

        assert!(authorize(&resource, me).is_ok());
    }

    #[test]
    fn test_authorize_other_user_forbidden() {
        let resource = Owned {
            owner: Uuid::new_v4(),
        };

        assert_eq!(
            authorize(&resource, Uuid::new_v4()),
            Err(OwnershipError::Forbidden)
        );
    }

    #[test]
    fn test_missing_resource_is_not_found() {
        let result = require_found_and_owned::<Owned>(None, Uuid::new_v4());
        assert!(matches!(result, Err(OwnershipError::NotFound)));
    }

    #[test]
    fn test_wrong_owner_is_forbidden() {
        let resource = Owned {
            owner: Uuid::new_v4(),
        };

        let result = require_found_and_owned(Some(resource), Uuid::new_v4());
        assert!(matches!(result, Err(OwnershipError::Forbidden)));
    }

    #[test]
    fn test_found_and_owned_returns_resource() {
        let me = Uuid::new_v4();
        let resource = Owned { owner: me };

        let returned = require_found_and_owned(Some(resource), me).unwrap();
        assert_eq!(returned.owner_id(), me);
    }
}
