//! Composition root. The only place that picks concrete outbound adapters.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    adapters::outbound::{
        cloudinary::CloudinaryAssetStore,
        memory::{InMemoryAssetStore, InMemoryPhotoRepository},
        postgres::PostgresPhotoRepository,
    },
    config::{Settings, StorageProvider},
    domain::{
        ports::{
            inbound::PhotoService,
            outbound::{PhotoRepository, RemoteAssetStore},
        },
        services::PhotoServiceImpl,
    },
};

/// Builds the photo service from the configured repository and asset store.
pub async fn create_photo_service(config: &Settings) -> anyhow::Result<Arc<dyn PhotoService>> {
    let repository = create_repository(config).await?;
    let assets = create_asset_store(config)?;
    let policy = config.photos.policy();

    Ok(Arc::new(PhotoServiceImpl::new(repository, assets, policy)))
}

async fn create_repository(config: &Settings) -> anyhow::Result<Arc<dyn PhotoRepository>> {
    let Some(database) = &config.database else {
        tracing::warn!("no database configured, photos are kept in memory");
        return Ok(Arc::new(InMemoryPhotoRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(database.with_db())
        .await
        .context("failed to connect to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    tracing::info!(
        "connected to postgres at {}:{}",
        database.host,
        database.port
    );
    Ok(Arc::new(PostgresPhotoRepository::new(pool)))
}

fn create_asset_store(config: &Settings) -> anyhow::Result<Arc<dyn RemoteAssetStore>> {
    match config.storage.provider {
        StorageProvider::Memory => {
            tracing::warn!("using in-memory asset store, uploads are not persisted");
            Ok(Arc::new(InMemoryAssetStore::default()))
        }
        StorageProvider::Cloudinary => {
            let settings = config
                .storage
                .cloudinary
                .as_ref()
                .context("storage.cloudinary must be set when provider is cloudinary")?;
            let store = CloudinaryAssetStore::new(settings)
                .context("invalid cloudinary api base url")?;
            Ok(Arc::new(store))
        }
    }
}
