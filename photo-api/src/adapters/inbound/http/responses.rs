//! HTTP response types for photo endpoints.
//!
//! These types serialize to the JSON format expected by the frontend.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::models::PhotoView;

/// A photo as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: i32,
    pub url: String,
    pub description: Option<String>,
    /// When the photo was added (ISO 8601).
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
    pub is_main: bool,
}

impl From<PhotoView> for PhotoResponse {
    fn from(photo: PhotoView) -> Self {
        Self {
            id: photo.id.as_i32(),
            url: photo.url,
            description: photo.description,
            date_added: photo.date_added,
            is_main: photo.is_main,
        }
    }
}
