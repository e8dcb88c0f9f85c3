use bytes::Bytes;
use time::OffsetDateTime;

use super::{PhotoId, PublicId, UploadTransform, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub user_id: UserId,
    pub url: String,
    /// Only set when the binary lives in the remote asset store.
    pub public_id: Option<PublicId>,
    pub description: Option<String>,
    pub date_added: OffsetDateTime,
    pub is_main: bool,
}

/// A photo that has not been persisted yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub url: String,
    pub public_id: Option<PublicId>,
    pub description: Option<String>,
    pub date_added: OffsetDateTime,
    pub is_main: bool,
}

impl NewPhoto {
    pub fn new(
        url: impl Into<String>,
        public_id: Option<PublicId>,
        description: Option<String>,
        placement: PhotoPlacement,
    ) -> Self {
        Self {
            url: url.into(),
            public_id,
            description,
            date_added: OffsetDateTime::now_utc(),
            is_main: placement.is_main(),
        }
    }

    pub fn into_photo(self, id: PhotoId, user_id: UserId) -> Photo {
        Photo {
            id,
            user_id,
            url: self.url,
            public_id: self.public_id,
            description: self.description,
            date_added: self.date_added,
            is_main: self.is_main,
        }
    }
}

/// A user's photo collection as read at a given collection version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPhotos {
    pub user_id: UserId,
    /// Bumped by every successful commit, used to detect concurrent writers.
    pub version: i64,
    pub photos: Vec<Photo>,
}

impl UserPhotos {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            version: 0,
            photos: Vec::new(),
        }
    }

    pub fn contains(&self, photo_id: &PhotoId) -> bool {
        self.photos.iter().any(|photo| photo.id == *photo_id)
    }

    pub fn main_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.is_main)
    }

    pub fn has_main(&self) -> bool {
        self.main_photo().is_some()
    }
}

#[cfg(test)]
impl UserPhotos {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Public representation of a photo. The remote public id stays internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoView {
    pub id: PhotoId,
    pub url: String,
    pub description: Option<String>,
    pub date_added: OffsetDateTime,
    pub is_main: bool,
}

impl From<Photo> for PhotoView {
    fn from(photo: Photo) -> Self {
        Self {
            id: photo.id,
            url: photo.url,
            description: photo.description,
            date_added: photo.date_added,
            is_main: photo.is_main,
        }
    }
}

impl From<&Photo> for PhotoView {
    fn from(photo: &Photo) -> Self {
        photo.clone().into()
    }
}

pub struct PhotoUpload {
    pub content: Bytes,
    pub description: Option<String>,
    pub transform: UploadTransform,
}

impl PhotoUpload {
    pub fn new(content: impl Into<Bytes>, transform: UploadTransform) -> Self {
        Self {
            content: content.into(),
            description: None,
            transform,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Where a freshly uploaded photo lands in its owner's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoPlacement {
    Main,
    Secondary,
}

impl PhotoPlacement {
    /// The first photo of a collection becomes main, later ones never
    /// displace the existing main photo.
    pub fn for_collection(collection: &UserPhotos) -> Self {
        if collection.has_main() {
            Self::Secondary
        } else {
            Self::Main
        }
    }

    pub fn is_main(self) -> bool {
        matches!(self, Self::Main)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCreated {
    pub photo: PhotoView,
    pub placement: PhotoPlacement,
}

/// What promoting a photo to main requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Promote {
        target: PhotoId,
        /// Current main photo, absent only for a collection without one.
        demoted: Option<PhotoId>,
    },
    AlreadyMain,
}

impl Promotion {
    pub fn plan(target: &Photo, current_main: Option<&Photo>) -> Self {
        if target.is_main {
            return Self::AlreadyMain;
        }

        Self::Promote {
            target: target.id,
            demoted: current_main
                .filter(|main| main.id != target.id)
                .map(|main| main.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: i32, is_main: bool) -> Photo {
        Photo {
            id: PhotoId::new(id),
            user_id: UserId::new(1),
            url: format!("https://img.example/{id}.jpg"),
            public_id: None,
            description: None,
            date_added: OffsetDateTime::UNIX_EPOCH,
            is_main,
        }
    }

    #[test]
    fn first_photo_is_placed_as_main() {
        let collection = UserPhotos::empty(UserId::new(1));
        assert_eq!(
            PhotoPlacement::for_collection(&collection),
            PhotoPlacement::Main
        );
    }

    #[test]
    fn later_photos_are_secondary() {
        let mut collection = UserPhotos::empty(UserId::new(1));
        collection.photos.push(photo(1, true));
        assert_eq!(
            PhotoPlacement::for_collection(&collection),
            PhotoPlacement::Secondary
        );
    }

    #[test]
    fn collection_without_main_places_new_photo_as_main() {
        let mut collection = UserPhotos::empty(UserId::new(1));
        collection.photos.push(photo(1, false));
        assert_eq!(
            PhotoPlacement::for_collection(&collection),
            PhotoPlacement::Main
        );
    }

    #[test]
    fn promotion_demotes_current_main() {
        let main = photo(1, true);
        let target = photo(2, false);

        assert_eq!(
            Promotion::plan(&target, Some(&main)),
            Promotion::Promote {
                target: PhotoId::new(2),
                demoted: Some(PhotoId::new(1)),
            }
        );
    }

    #[test]
    fn promotion_of_main_photo_is_rejected() {
        let main = photo(1, true);
        assert_eq!(Promotion::plan(&main, Some(&main)), Promotion::AlreadyMain);
    }

    #[test]
    fn promotion_without_main_only_promotes() {
        let target = photo(2, false);
        assert_eq!(
            Promotion::plan(&target, None),
            Promotion::Promote {
                target: PhotoId::new(2),
                demoted: None,
            }
        );
    }
}
