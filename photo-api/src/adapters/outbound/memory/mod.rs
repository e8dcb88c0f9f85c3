mod asset_store;
mod photo_repository;

pub use asset_store::InMemoryAssetStore;
pub use photo_repository::InMemoryPhotoRepository;
