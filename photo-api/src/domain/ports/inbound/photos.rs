use async_trait::async_trait;

use crate::domain::{
    models::{PhotoCreated, PhotoId, PhotoUpload, PhotoView, UserId},
    PhotoError,
};

#[async_trait]
pub trait PhotoService: Send + Sync + 'static {
    async fn get_photo(&self, photo_id: &PhotoId) -> Result<PhotoView, PhotoError>;

    async fn list_photos(&self, user_id: &UserId) -> Result<Vec<PhotoView>, PhotoError>;

    async fn get_main_photo(&self, user_id: &UserId) -> Result<PhotoView, PhotoError>;

    async fn add_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        upload: PhotoUpload,
    ) -> Result<PhotoCreated, PhotoError>;

    async fn set_main_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        photo_id: &PhotoId,
    ) -> Result<(), PhotoError>;

    async fn delete_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        photo_id: &PhotoId,
    ) -> Result<(), PhotoError>;
}
