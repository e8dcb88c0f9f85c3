use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app_state::AppState;

mod adapters;
mod app_state;
mod auth;
mod config;
mod domain;
mod factory;
mod router;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::read_config().context("failed to read configuration")?;

    let photo_service = factory::create_photo_service(&config).await?;
    let app_state = AppState::new(
        photo_service,
        config.photos.transform.clone(),
        &config.application.identity_header,
    )?;
    let app = router::create(app_state, &config);

    let addr = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
