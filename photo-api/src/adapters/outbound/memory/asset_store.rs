use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::domain::{
    models::{AssetDeletion, PublicId, UploadTransform, UploadedAsset},
    ports::outbound::RemoteAssetStore,
    AssetStoreError,
};

/// Asset store that keeps uploads in memory, for local development.
pub struct InMemoryAssetStore {
    base_url: String,
    assets: RwLock<HashMap<PublicId, Bytes>>,
    counter: AtomicU64,
    #[cfg(test)]
    faults: std::sync::Mutex<Faults>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    upload: Option<AssetStoreError>,
    delete: Option<AssetStoreError>,
    delay: Option<std::time::Duration>,
    delete_calls: Vec<PublicId>,
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new("memory://photos")
    }
}

impl InMemoryAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            assets: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            #[cfg(test)]
            faults: std::sync::Mutex::new(Faults::default()),
        }
    }
}

#[cfg(test)]
impl InMemoryAssetStore {
    pub async fn contains(&self, public_id: &PublicId) -> bool {
        self.assets.read().await.contains_key(public_id)
    }

    pub fn fail_uploads(&self, error: AssetStoreError) {
        self.faults.lock().unwrap().upload = Some(error);
    }

    pub fn fail_deletes(&self, error: AssetStoreError) {
        self.faults.lock().unwrap().delete = Some(error);
    }

    pub fn delay_calls(&self, delay: std::time::Duration) {
        self.faults.lock().unwrap().delay = Some(delay);
    }

    /// Public ids passed to `delete`, in call order.
    pub fn delete_calls(&self) -> Vec<PublicId> {
        self.faults.lock().unwrap().delete_calls.clone()
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    async fn inject(&self, upload: bool) -> Result<(), AssetStoreError> {
        let (delay, error) = {
            let faults = self.faults.lock().unwrap();
            let error = if upload {
                faults.upload.clone()
            } else {
                faults.delete.clone()
            };
            (faults.delay, error)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RemoteAssetStore for InMemoryAssetStore {
    async fn upload(
        &self,
        content: Bytes,
        transform: &UploadTransform,
    ) -> Result<UploadedAsset, AssetStoreError> {
        #[cfg(test)]
        self.inject(true).await?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let public_id = PublicId::new(format!("photo-{n}"));
        let url = format!(
            "{}/w_{},h_{}/{public_id}",
            self.base_url.trim_end_matches('/'),
            transform.width,
            transform.height
        );

        self.assets.write().await.insert(public_id.clone(), content);

        Ok(UploadedAsset::new(url, public_id))
    }

    async fn delete(&self, public_id: &PublicId) -> Result<AssetDeletion, AssetStoreError> {
        #[cfg(test)]
        {
            self.faults
                .lock()
                .unwrap()
                .delete_calls
                .push(public_id.clone());
            self.inject(false).await?;
        }

        match self.assets.write().await.remove(public_id) {
            Some(_) => Ok(AssetDeletion::Deleted),
            None => Ok(AssetDeletion::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete() {
        let store = InMemoryAssetStore::default();
        let asset = store
            .upload(Bytes::from_static(b"img"), &UploadTransform::default())
            .await
            .unwrap();

        assert!(store.contains(&asset.public_id).await);
        assert!(asset.url.ends_with(asset.public_id.as_str()));
        assert_eq!(
            store.delete(&asset.public_id).await.unwrap(),
            AssetDeletion::Deleted
        );
        assert_eq!(
            store.delete(&asset.public_id).await.unwrap(),
            AssetDeletion::NotFound
        );
    }

    #[tokio::test]
    async fn injected_upload_failure_stores_nothing() {
        let store = InMemoryAssetStore::default();
        store.fail_uploads(AssetStoreError::Unavailable("down".into()));

        let result = store
            .upload(Bytes::from_static(b"img"), &UploadTransform::default())
            .await;

        assert!(matches!(result, Err(AssetStoreError::Unavailable(_))));
        assert_eq!(store.len().await, 0);
    }
}
