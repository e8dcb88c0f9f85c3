use super::{NewPhoto, Photo, PhotoId, UserId};
use crate::domain::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoChange {
    Insert(NewPhoto),
    SetMain { photo_id: PhotoId, is_main: bool },
    Remove(PhotoId),
}

/// A batch of mutations to one user's collection, committed all-or-nothing.
///
/// `expected_version` is the collection version the batch was computed
/// from. The repository rejects the batch with [`PersistenceError::Conflict`]
/// when another writer committed in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoChangeSet {
    pub user_id: UserId,
    pub expected_version: i64,
    pub changes: Vec<PhotoChange>,
}

impl PhotoChangeSet {
    pub fn new(user_id: UserId, expected_version: i64) -> Self {
        Self {
            user_id,
            expected_version,
            changes: Vec::new(),
        }
    }

    pub fn with(mut self, change: PhotoChange) -> Self {
        self.changes.push(change);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub version: i64,
    pub inserted: Vec<Photo>,
}

/// Checks that a non-empty collection has exactly one main photo.
pub fn verify_single_main(user_id: UserId, photos: &[Photo]) -> Result<(), PersistenceError> {
    let mains = photos.iter().filter(|photo| photo.is_main).count();
    verify_main_count(user_id, photos.len(), mains)
}

pub fn verify_main_count(
    user_id: UserId,
    total: usize,
    mains: usize,
) -> Result<(), PersistenceError> {
    if total == 0 || mains == 1 {
        return Ok(());
    }

    Err(PersistenceError::InvariantViolation(format!(
        "user {user_id} would have {mains} main photos"
    )))
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn photo(id: i32, is_main: bool) -> Photo {
        Photo {
            id: PhotoId::new(id),
            user_id: UserId::new(7),
            url: "https://img.example/p.jpg".to_string(),
            public_id: None,
            description: None,
            date_added: OffsetDateTime::UNIX_EPOCH,
            is_main,
        }
    }

    #[test]
    fn empty_collection_needs_no_main() {
        assert!(verify_single_main(UserId::new(7), &[]).is_ok());
    }

    #[test]
    fn single_main_is_accepted() {
        let photos = vec![photo(1, true), photo(2, false)];
        assert!(verify_single_main(UserId::new(7), &photos).is_ok());
    }

    #[test]
    fn zero_or_two_mains_are_rejected() {
        let none = vec![photo(1, false), photo(2, false)];
        let two = vec![photo(1, true), photo(2, true)];

        assert!(matches!(
            verify_single_main(UserId::new(7), &none),
            Err(PersistenceError::InvariantViolation(_))
        ));
        assert!(matches!(
            verify_single_main(UserId::new(7), &two),
            Err(PersistenceError::InvariantViolation(_))
        ));
    }
}
