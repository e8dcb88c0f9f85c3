use std::time::Duration;

use thiserror::Error;

use crate::domain::models::{PublicId, UserId};

/// Errors that can occur during photo collection operations.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("not allowed to modify this photo collection")]
    Denied,
    #[error("photo not found")]
    NotFound,
    #[error("invalid photo upload: {0}")]
    Validation(String),
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
    #[error("remote asset store failure: {0}")]
    Storage(#[from] AssetStoreError),
    #[error("photo metadata commit failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl PhotoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// An operation that would break a collection invariant given its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidState {
    #[error("this is already the main photo")]
    AlreadyMain,
    #[error("you cannot delete your main photo")]
    MainPhotoDeletion,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetStoreError {
    #[error("asset store unavailable: {0}")]
    Unavailable(String),
    #[error("asset store rejected the request: {0}")]
    Rejected(String),
    #[error("asset {0} does not exist in the remote store")]
    Missing(PublicId),
    #[error("asset store did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("photo collection of user {0} was modified concurrently")]
    Conflict(UserId),
    #[error("main photo invariant violated: {0}")]
    InvariantViolation(String),
    #[error("{0}")]
    Backend(String),
}

impl PersistenceError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Whether a retry of the whole operation may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvariantViolation(_))
    }
}
