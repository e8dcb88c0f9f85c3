use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::instrument;

use crate::domain::{
    authorization::authorize,
    models::{
        AssetDeletion, MissingAssetPolicy, NewPhoto, PhotoChange, PhotoChangeSet, PhotoCreated,
        PhotoId, PhotoPlacement, PhotoUpload, PhotoView, Promotion, PublicId, UserId,
    },
    ports::{
        inbound::PhotoService,
        outbound::{PhotoRepository, RemoteAssetStore},
    },
    AssetStoreError, InvalidState, PersistenceError, PhotoError,
};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REMOVE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct PhotoPolicy {
    pub max_upload_bytes: usize,
    /// Upper bound for a single upload or delete call to the asset store.
    pub remote_timeout: Duration,
    pub missing_asset_policy: MissingAssetPolicy,
}

impl Default for PhotoPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            missing_asset_policy: MissingAssetPolicy::default(),
        }
    }
}

/// Keeps a user's photo metadata and the remote asset store in step.
///
/// Metadata never references an asset whose upload was not confirmed, and
/// metadata is only removed after the remote delete was confirmed. The
/// repository is never held locked while a remote call is in flight.
pub struct PhotoServiceImpl<R: ?Sized, S: ?Sized> {
    repository: Arc<R>,
    assets: Arc<S>,
    policy: PhotoPolicy,
}

impl<R: ?Sized, S: ?Sized> PhotoServiceImpl<R, S> {
    pub fn new(repository: Arc<R>, assets: Arc<S>, policy: PhotoPolicy) -> Self {
        Self {
            repository,
            assets,
            policy,
        }
    }

    fn validate_upload(&self, content: &[u8]) -> Result<(), PhotoError> {
        if content.is_empty() {
            return Err(PhotoError::validation("photo file is empty"));
        }

        if content.len() > self.policy.max_upload_bytes {
            return Err(PhotoError::validation(format!(
                "photo exceeds {} bytes",
                self.policy.max_upload_bytes
            )));
        }

        Ok(())
    }

    async fn with_remote_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, AssetStoreError>>,
    ) -> Result<T, AssetStoreError> {
        tokio::time::timeout(self.policy.remote_timeout, call)
            .await
            .map_err(|_| AssetStoreError::Timeout(self.policy.remote_timeout))?
    }
}

impl<R: PhotoRepository + ?Sized, S: RemoteAssetStore + ?Sized> PhotoServiceImpl<R, S> {
    /// Loads the caller's collection and checks that `photo_id` is part of it.
    ///
    /// Foreign or unknown ids are reported as `Denied`, which hides the photos
    /// of other users.
    async fn owned_collection_version(
        &self,
        user_id: &UserId,
        photo_id: &PhotoId,
    ) -> Result<i64, PhotoError> {
        let collection = self.repository.get_user(user_id).await?;

        if !collection.contains(photo_id) {
            tracing::debug!(%user_id, %photo_id, "photo is not part of the user's collection");
            return Err(PhotoError::Denied);
        }

        Ok(collection.version)
    }

    /// Commits the removal of a photo, starting from `version`.
    ///
    /// The remote asset may already be gone at this point, so a stale
    /// version is not final: the removal is retried against the current
    /// collection as long as the photo is still there and not main.
    async fn remove_photo(
        &self,
        user_id: &UserId,
        photo_id: &PhotoId,
        mut version: i64,
    ) -> Result<(), PersistenceError> {
        let mut attempt = 1;
        loop {
            let changes =
                PhotoChangeSet::new(*user_id, version).with(PhotoChange::Remove(*photo_id));

            match self.repository.commit(changes).await {
                Ok(_) => return Ok(()),
                Err(PersistenceError::Conflict(_)) if attempt < MAX_REMOVE_ATTEMPTS => {
                    let collection = self.repository.get_user(user_id).await?;
                    let removable = collection
                        .photos
                        .iter()
                        .any(|photo| photo.id == *photo_id && !photo.is_main);
                    if !removable {
                        return Err(PersistenceError::Conflict(*user_id));
                    }

                    tracing::debug!(
                        %user_id,
                        %photo_id,
                        attempt,
                        version = collection.version,
                        "retrying photo removal against newer collection"
                    );
                    version = collection.version;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn delete_remote_asset(&self, public_id: &PublicId) -> Result<(), AssetStoreError> {
        match self.with_remote_timeout(self.assets.delete(public_id)).await? {
            AssetDeletion::Deleted => Ok(()),
            AssetDeletion::NotFound => match self.policy.missing_asset_policy {
                MissingAssetPolicy::Fail => Err(AssetStoreError::Missing(public_id.clone())),
                MissingAssetPolicy::TreatAsDeleted => {
                    tracing::debug!(%public_id, "remote asset already absent");
                    Ok(())
                }
            },
        }
    }
}

#[async_trait]
impl<R: PhotoRepository + ?Sized, S: RemoteAssetStore + ?Sized> PhotoService for PhotoServiceImpl<R, S> {
    async fn get_photo(&self, photo_id: &PhotoId) -> Result<PhotoView, PhotoError> {
        self.repository
            .get_photo(photo_id)
            .await?
            .map(PhotoView::from)
            .ok_or(PhotoError::NotFound)
    }

    async fn list_photos(&self, user_id: &UserId) -> Result<Vec<PhotoView>, PhotoError> {
        let mut photos = self.repository.get_user(user_id).await?.photos;
        photos.sort_by_key(|photo| (!photo.is_main, photo.id));

        Ok(photos.into_iter().map(PhotoView::from).collect())
    }

    async fn get_main_photo(&self, user_id: &UserId) -> Result<PhotoView, PhotoError> {
        self.repository
            .get_main_photo(user_id)
            .await?
            .map(PhotoView::from)
            .ok_or(PhotoError::NotFound)
    }

    #[instrument(skip(self, upload), fields(bytes = upload.content.len()))]
    async fn add_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        upload: PhotoUpload,
    ) -> Result<PhotoCreated, PhotoError> {
        authorize(caller, user_id).require()?;

        let collection = self.repository.get_user(user_id).await?;
        self.validate_upload(&upload.content)?;

        let asset = self
            .with_remote_timeout(self.assets.upload(upload.content, &upload.transform))
            .await?;

        let placement = PhotoPlacement::for_collection(&collection);
        let new_photo = NewPhoto::new(
            asset.url,
            Some(asset.public_id.clone()),
            upload.description,
            placement,
        );
        let changes = PhotoChangeSet::new(*user_id, collection.version)
            .with(PhotoChange::Insert(new_photo));

        let receipt = self.repository.commit(changes).await.map_err(|err| {
            tracing::warn!(
                %user_id,
                public_id = %asset.public_id,
                error = %err,
                "photo metadata was not saved, uploaded asset is orphaned"
            );
            err
        })?;

        let photo = receipt
            .inserted
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::backend("commit returned no inserted photo"))?;

        tracing::info!(%user_id, photo_id = %photo.id, ?placement, "photo added");

        Ok(PhotoCreated {
            photo: photo.into(),
            placement,
        })
    }

    #[instrument(skip(self))]
    async fn set_main_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        photo_id: &PhotoId,
    ) -> Result<(), PhotoError> {
        authorize(caller, user_id).require()?;

        let version = self.owned_collection_version(user_id, photo_id).await?;

        let target = self
            .repository
            .get_photo(photo_id)
            .await?
            .ok_or(PhotoError::NotFound)?;
        let current_main = self.repository.get_main_photo(user_id).await?;

        let Promotion::Promote { target, demoted } =
            Promotion::plan(&target, current_main.as_ref())
        else {
            return Err(InvalidState::AlreadyMain.into());
        };

        // Demote first so no intermediate state ever carries two mains.
        let mut changes = PhotoChangeSet::new(*user_id, version);
        if let Some(demoted) = demoted {
            changes = changes.with(PhotoChange::SetMain {
                photo_id: demoted,
                is_main: false,
            });
        } else {
            tracing::warn!(%user_id, "collection had no main photo");
        }
        changes = changes.with(PhotoChange::SetMain {
            photo_id: target,
            is_main: true,
        });

        self.repository.commit(changes).await?;

        tracing::info!(%user_id, photo_id = %target, "main photo changed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_photo(
        &self,
        caller: &UserId,
        user_id: &UserId,
        photo_id: &PhotoId,
    ) -> Result<(), PhotoError> {
        authorize(caller, user_id).require()?;

        let version = self.owned_collection_version(user_id, photo_id).await?;

        let photo = self
            .repository
            .get_photo(photo_id)
            .await?
            .ok_or(PhotoError::NotFound)?;

        if photo.is_main {
            return Err(InvalidState::MainPhotoDeletion.into());
        }

        if let Some(public_id) = &photo.public_id {
            self.delete_remote_asset(public_id).await?;
        }

        self.remove_photo(user_id, &photo.id, version).await.map_err(|err| {
            if let Some(public_id) = &photo.public_id {
                tracing::warn!(
                    %user_id,
                    %photo_id,
                    %public_id,
                    error = %err,
                    "remote asset deleted but photo metadata was kept"
                );
            }
            err
        })?;

        tracing::info!(%user_id, %photo_id, "photo deleted");
        Ok(())
    }
}
