use std::sync::Arc;

use axum::http::{header::InvalidHeaderName, HeaderName};

use crate::domain::{models::UploadTransform, ports::inbound::PhotoService};

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("invalid identity header name '{0}': {1}")]
    InvalidIdentityHeader(String, InvalidHeaderName),
}

#[derive(Clone)]
pub struct AppState {
    pub photo_service: Arc<dyn PhotoService>,
    pub upload_transform: UploadTransform,
    pub identity_header: HeaderName,
}

impl AppState {
    pub fn new(
        photo_service: Arc<dyn PhotoService>,
        upload_transform: UploadTransform,
        identity_header: &str,
    ) -> Result<Self, AppStateError> {
        let identity_header = HeaderName::try_from(identity_header).map_err(|err| {
            AppStateError::InvalidIdentityHeader(identity_header.to_string(), err)
        })?;

        Ok(Self {
            photo_service,
            upload_transform,
            identity_header,
        })
    }
}
