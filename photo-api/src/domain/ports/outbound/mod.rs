mod photo_repository;
mod remote_asset_store;

pub use photo_repository::*;
pub use remote_asset_store::*;
