//! Cloudinary-backed [`RemoteAssetStore`].
//!
//! Uses the signed upload and destroy endpoints of the Upload API. The
//! transformation is sent as an incoming transformation, so the stored asset
//! and its returned URL are already cropped.

mod signing;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::{
    config::CloudinarySettings,
    domain::{
        models::{AssetDeletion, PublicId, UploadTransform, UploadedAsset},
        ports::outbound::RemoteAssetStore,
        AssetStoreError,
    },
};

const SIGNATURE_ALGORITHM: &str = "sha256";

pub struct CloudinaryAssetStore {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryAssetStore {
    pub fn new(settings: &CloudinarySettings) -> Result<Self, url::ParseError> {
        let api_url = Url::parse(&settings.api_base_url)?
            .join(&format!("v1_1/{}/image/", settings.cloud_name))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_url,
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            folder: settings.folder.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> Result<Url, AssetStoreError> {
        self.api_url
            .join(action)
            .map_err(|err| AssetStoreError::Unavailable(format!("invalid endpoint: {err}")))
    }

    /// Appends api key, signature and algorithm to the signed parameters.
    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = signing::sign(&params, &self.api_secret);

        let mut form = params;
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", SIGNATURE_ALGORITHM.to_string()));
        form
    }

    async fn error_from(response: reqwest::Response) -> AssetStoreError {
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            AssetStoreError::Unavailable(message)
        } else {
            AssetStoreError::Rejected(message)
        }
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc().unix_timestamp().to_string()
}

fn unavailable(err: reqwest::Error) -> AssetStoreError {
    AssetStoreError::Unavailable(err.to_string())
}

#[async_trait]
impl RemoteAssetStore for CloudinaryAssetStore {
    async fn upload(
        &self,
        content: Bytes,
        transform: &UploadTransform,
    ) -> Result<UploadedAsset, AssetStoreError> {
        let mut params = vec![
            ("timestamp", timestamp()),
            ("transformation", signing::transformation(transform)),
        ];
        if let Some(folder) = &self.folder {
            params.push(("folder", folder.clone()));
        }

        let file = multipart::Part::bytes(content.to_vec()).file_name("photo");
        let form = self
            .signed_form(params)
            .into_iter()
            .fold(multipart::Form::new().part("file", file), |form, (key, value)| {
                form.text(key, value)
            });

        let response = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body = response
            .json::<UploadResponse>()
            .await
            .map_err(|err| AssetStoreError::Rejected(format!("unexpected upload response: {err}")))?;

        tracing::debug!(public_id = %body.public_id, "uploaded photo to cloudinary");
        Ok(UploadedAsset::new(body.secure_url, body.public_id))
    }

    async fn delete(&self, public_id: &PublicId) -> Result<AssetDeletion, AssetStoreError> {
        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp()),
        ]);

        let response = self
            .client
            .post(self.endpoint("destroy")?)
            .form(&form)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body = response
            .json::<DestroyResponse>()
            .await
            .map_err(|err| AssetStoreError::Rejected(format!("unexpected destroy response: {err}")))?;

        match body.result.as_str() {
            "ok" => Ok(AssetDeletion::Deleted),
            "not found" => Ok(AssetDeletion::NotFound),
            other => Err(AssetStoreError::Rejected(format!(
                "destroy of {public_id} answered '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str) -> CloudinarySettings {
        CloudinarySettings {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            api_base_url: base.to_string(),
            folder: None,
        }
    }

    #[test]
    fn endpoints_are_scoped_to_cloud() {
        let store = CloudinaryAssetStore::new(&settings("https://api.cloudinary.com/")).unwrap();

        assert_eq!(
            store.endpoint("upload").unwrap().as_str(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
        assert_eq!(
            store.endpoint("destroy").unwrap().as_str(),
            "https://api.cloudinary.com/v1_1/demo/image/destroy"
        );
    }

    #[test]
    fn signed_form_carries_credentials() {
        let store = CloudinaryAssetStore::new(&settings("https://api.cloudinary.com/")).unwrap();
        let form = store.signed_form(vec![("timestamp", "1".to_string())]);
        let keys = form.iter().map(|(key, _)| *key).collect::<Vec<_>>();

        assert_eq!(
            keys,
            vec!["timestamp", "api_key", "signature", "signature_algorithm"]
        );
        assert_eq!(
            form[2].1,
            signing::sign(&[("timestamp", "1".to_string())], "secret")
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let store = CloudinaryAssetStore::new(&settings("http://127.0.0.1:9/")).unwrap();

        let err = store
            .delete(&PublicId::new("sample"))
            .await
            .unwrap_err();

        assert!(matches!(err, AssetStoreError::Unavailable(_)));
    }
}
