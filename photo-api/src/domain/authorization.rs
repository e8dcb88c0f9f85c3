//! Ownership gate applied before any photo collection is mutated.

use crate::domain::{models::UserId, PhotoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Denied,
}

impl Authorization {
    pub fn require(self) -> Result<(), PhotoError> {
        match self {
            Self::Authorized => Ok(()),
            Self::Denied => Err(PhotoError::Denied),
        }
    }
}

/// Decides whether `caller` may mutate resources owned by `claimed_owner`.
pub fn authorize(caller: &UserId, claimed_owner: &UserId) -> Authorization {
    if caller == claimed_owner {
        Authorization::Authorized
    } else {
        Authorization::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_authorized() {
        let user = UserId::new(4);
        assert_eq!(authorize(&user, &user), Authorization::Authorized);
        assert!(authorize(&user, &user).require().is_ok());
    }

    #[test]
    fn other_caller_is_denied() {
        let decision = authorize(&UserId::new(4), &UserId::new(5));
        assert_eq!(decision, Authorization::Denied);
        assert!(matches!(decision.require(), Err(PhotoError::Denied)));
    }
}
