use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    models::{
        verify_single_main, CommitReceipt, Photo, PhotoChange, PhotoChangeSet, PhotoId, UserId,
        UserPhotos,
    },
    ports::outbound::PhotoRepository,
    PersistenceError,
};

#[derive(Debug, Default)]
struct Collection {
    version: i64,
    photos: Vec<Photo>,
}

/// Photo metadata kept in process memory.
///
/// Every user's collection sits behind its own mutex, so commits for
/// different users never wait on each other. Commits are checked against the
/// collection version they were computed from.
#[derive(Default)]
pub struct InMemoryPhotoRepository {
    collections: RwLock<HashMap<UserId, Arc<Mutex<Collection>>>>,
    owners: RwLock<HashMap<PhotoId, UserId>>,
    next_id: AtomicI32,
    #[cfg(test)]
    fail_commits: std::sync::atomic::AtomicBool,
}

impl InMemoryPhotoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collection(&self, user_id: &UserId) -> Option<Arc<Mutex<Collection>>> {
        self.collections.read().await.get(user_id).cloned()
    }

    async fn collection_or_default(&self, user_id: &UserId) -> Arc<Mutex<Collection>> {
        if let Some(collection) = self.collection(user_id).await {
            return collection;
        }

        let mut collections = self.collections.write().await;
        Arc::clone(collections.entry(*user_id).or_default())
    }

    fn allocate_id(&self) -> PhotoId {
        PhotoId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
impl InMemoryPhotoRepository {
    /// Makes every following commit fail with a backend error.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Places a photo straight into a collection, bypassing the invariant check.
    pub async fn seed(&self, photo: Photo) {
        let collection = self.collection_or_default(&photo.user_id).await;
        let mut collection = collection.lock().await;
        self.owners.write().await.insert(photo.id, photo.user_id);
        self.next_id.fetch_max(photo.id.as_i32(), Ordering::Relaxed);
        collection.photos.push(photo);
    }
}

#[async_trait]
impl PhotoRepository for InMemoryPhotoRepository {
    async fn get_photo(&self, photo_id: &PhotoId) -> Result<Option<Photo>, PersistenceError> {
        let Some(owner) = self.owners.read().await.get(photo_id).copied() else {
            return Ok(None);
        };

        let Some(collection) = self.collection(&owner).await else {
            return Ok(None);
        };

        let collection = collection.lock().await;
        Ok(collection
            .photos
            .iter()
            .find(|photo| photo.id == *photo_id)
            .cloned())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<UserPhotos, PersistenceError> {
        let Some(collection) = self.collection(user_id).await else {
            return Ok(UserPhotos::empty(*user_id));
        };

        let collection = collection.lock().await;
        Ok(UserPhotos {
            user_id: *user_id,
            version: collection.version,
            photos: collection.photos.clone(),
        })
    }

    async fn get_main_photo(&self, user_id: &UserId) -> Result<Option<Photo>, PersistenceError> {
        let Some(collection) = self.collection(user_id).await else {
            return Ok(None);
        };

        let collection = collection.lock().await;
        Ok(collection.photos.iter().find(|photo| photo.is_main).cloned())
    }

    async fn commit(&self, changes: PhotoChangeSet) -> Result<CommitReceipt, PersistenceError> {
        #[cfg(test)]
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PersistenceError::backend("injected commit failure"));
        }

        let user_id = changes.user_id;
        let collection = self.collection_or_default(&user_id).await;
        let mut collection = collection.lock().await;

        if collection.version != changes.expected_version {
            tracing::debug!(
                user_id = %user_id,
                expected = changes.expected_version,
                actual = collection.version,
                "rejecting stale photo change set"
            );
            return Err(PersistenceError::Conflict(user_id));
        }

        // Work on a copy so a rejected batch leaves nothing behind.
        let mut photos = collection.photos.clone();
        let mut inserted = Vec::new();
        let mut removed = Vec::new();

        for change in changes.changes {
            match change {
                PhotoChange::Insert(new_photo) => {
                    let photo = new_photo.into_photo(self.allocate_id(), user_id);
                    photos.push(photo.clone());
                    inserted.push(photo);
                }
                PhotoChange::SetMain { photo_id, is_main } => {
                    let photo = photos
                        .iter_mut()
                        .find(|photo| photo.id == photo_id)
                        .ok_or(PersistenceError::Conflict(user_id))?;
                    photo.is_main = is_main;
                }
                PhotoChange::Remove(photo_id) => {
                    let before = photos.len();
                    photos.retain(|photo| photo.id != photo_id);
                    if photos.len() == before {
                        return Err(PersistenceError::Conflict(user_id));
                    }
                    removed.push(photo_id);
                }
            }
        }

        verify_single_main(user_id, &photos)?;

        {
            let mut owners = self.owners.write().await;
            for photo in &inserted {
                owners.insert(photo.id, user_id);
            }
            for photo_id in &removed {
                owners.remove(photo_id);
            }
        }

        collection.photos = photos;
        collection.version += 1;

        Ok(CommitReceipt {
            version: collection.version,
            inserted,
        })
    }
}
