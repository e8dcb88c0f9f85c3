use async_trait::async_trait;

use crate::domain::{
    models::{CommitReceipt, Photo, PhotoChangeSet, PhotoId, UserId, UserPhotos},
    PersistenceError,
};

#[async_trait]
pub trait PhotoRepository: Send + Sync + 'static {
    async fn get_photo(&self, photo_id: &PhotoId) -> Result<Option<Photo>, PersistenceError>;

    /// Loads a user's whole collection. Users without photos get an empty
    /// collection at version 0.
    async fn get_user(&self, user_id: &UserId) -> Result<UserPhotos, PersistenceError>;

    async fn get_main_photo(&self, user_id: &UserId) -> Result<Option<Photo>, PersistenceError>;

    /// Applies every change of the batch or none of them.
    async fn commit(&self, changes: PhotoChangeSet) -> Result<CommitReceipt, PersistenceError>;
}
