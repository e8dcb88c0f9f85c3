use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    models::{AssetDeletion, PublicId, UploadTransform, UploadedAsset},
    AssetStoreError,
};

#[async_trait]
pub trait RemoteAssetStore: Send + Sync + 'static {
    async fn upload(
        &self,
        content: Bytes,
        transform: &UploadTransform,
    ) -> Result<UploadedAsset, AssetStoreError>;

    async fn delete(&self, public_id: &PublicId) -> Result<AssetDeletion, AssetStoreError>;
}
