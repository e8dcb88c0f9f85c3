use serde::Deserialize;

use super::PublicId;

/// Target dimensions and crop strategy handed to the asset store on upload.
///
/// The domain never interprets these values, adapters render them in
/// whatever form their host understands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadTransform {
    pub width: u32,
    pub height: u32,
    pub crop: String,
    pub gravity: Option<String>,
}

impl Default for UploadTransform {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            crop: "fill".to_string(),
            gravity: Some("face".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: PublicId,
}

impl UploadedAsset {
    pub fn new(url: impl Into<String>, public_id: impl Into<PublicId>) -> Self {
        Self {
            url: url.into(),
            public_id: public_id.into(),
        }
    }
}

/// Outcome of a confirmed remote delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetDeletion {
    Deleted,
    /// The store answered, but had no object under the requested id.
    NotFound,
}

/// How a remote "not found" answer to a delete is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAssetPolicy {
    /// Abort the photo deletion and keep the metadata row.
    #[default]
    Fail,
    /// Treat the delete as idempotent and remove the metadata row.
    TreatAsDeleted,
}
