//! Authorization guard. Pure checks: nothing here touches storage.

use crate::domain::{Identity, Post, Principal};
use crate::error::DomainError;

/// Whether `principal` may edit or delete `post`: only its author can.
pub fn can_modify(principal: &Principal, post: &Post) -> bool {
    match principal {
        Principal::Authenticated(identity) => identity.user_id == post.author_id,
        Principal::Anonymous => false,
    }
}

/// Whether `principal` may create or delete groups.
pub fn can_administer(principal: &Principal) -> bool {
    match principal {
        Principal::Authenticated(identity) => identity.is_staff,
        Principal::Anonymous => false,
    }
}

/// [`can_modify`] as an error: anonymous callers are `Unauthenticated`,
/// everyone else who is not the author is `PermissionDenied`.
pub fn authorize_post_write<'a>(
    principal: &'a Principal,
    post: &Post,
) -> Result<&'a Identity, DomainError> {
    let identity = principal.require()?;
    if can_modify(principal, post) {
        Ok(identity)
    } else {
        Err(DomainError::PermissionDenied)
    }
}

pub fn authorize_admin(principal: &Principal) -> Result<&Identity, DomainError> {
    let identity = principal.require()?;
    if can_administer(principal) {
        Ok(identity)
    } else {
        Err(DomainError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn principal(user_id: i64, is_staff: bool) -> Principal {
        Principal::Authenticated(Identity {
            user_id,
            username: format!("user{user_id}"),
            is_staff,
        })
    }

    fn post_by(author_id: i64) -> Post {
        Post {
            id: 10,
            text: "text".to_string(),
            created_at: Utc::now(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    #[test]
    fn test_author_can_modify() {
        for author in 1..20 {
            assert!(can_modify(&principal(author, false), &post_by(author)));
        }
    }

    #[test]
    fn test_other_users_cannot_modify() {
        let post = post_by(1);
        for other in 2..20 {
            assert!(!can_modify(&principal(other, true), &post));
        }
        assert!(!can_modify(&Principal::Anonymous, &post));
    }

    #[test]
    fn test_authorize_post_write_errors() {
        let post = post_by(1);
        assert!(matches!(
            authorize_post_write(&Principal::Anonymous, &post),
            Err(DomainError::Unauthenticated)
        ));
        assert!(matches!(
            authorize_post_write(&principal(2, false), &post),
            Err(DomainError::PermissionDenied)
        ));
        assert_eq!(authorize_post_write(&principal(1, false), &post).unwrap().user_id, 1);
    }

    #[test]
    fn test_only_staff_administer() {
        assert!(can_administer(&principal(1, true)));
        assert!(!can_administer(&principal(1, false)));
        assert!(!can_administer(&Principal::Anonymous));
        assert!(matches!(
            authorize_admin(&principal(1, false)),
            Err(DomainError::PermissionDenied)
        ));
    }
}
