use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    adapters::inbound::http::PhotoResponse,
    app_state::AppState,
    auth::CallerIdentity,
    domain::models::{PhotoId, PhotoUpload, UserId},
    routes::ApiError,
};

// Multipart framing on top of the photo payload itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/:user_id/photos", get(list_photos).post(add_photo))
        .route("/:user_id/main-photo", get(main_photo))
        .route(
            "/:user_id/photos/:photo_id",
            get(get_photo).delete(delete_photo),
        )
        .route("/:user_id/photos/:photo_id/setMain", post(set_main_photo))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
}

#[instrument(name = "GET /users/:user_id/photos", skip(app_state))]
async fn list_photos(
    State(app_state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<PhotoResponse>>, ApiError> {
    let photos = app_state
        .photo_service
        .list_photos(&UserId::from(user_id))
        .await?;

    Ok(Json(photos.into_iter().map(PhotoResponse::from).collect()))
}

#[instrument(name = "GET /users/:user_id/main-photo", skip(app_state))]
async fn main_photo(
    State(app_state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let photo = app_state
        .photo_service
        .get_main_photo(&UserId::from(user_id))
        .await?;

    Ok(Json(photo.into()))
}

#[instrument(name = "GET /users/:user_id/photos/:photo_id", skip(app_state))]
async fn get_photo(
    State(app_state): State<AppState>,
    Path((_user_id, photo_id)): Path<(i32, i32)>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let photo = app_state
        .photo_service
        .get_photo(&PhotoId::from(photo_id))
        .await?;

    Ok(Json(photo.into()))
}

#[instrument(name = "POST /users/:user_id/photos", skip(app_state, multipart))]
async fn add_photo(
    caller: CallerIdentity,
    State(app_state): State<AppState>,
    Path(user_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let (content, description) = extract_photo_from_multipart(&mut multipart).await?;

    let mut upload = PhotoUpload::new(content, app_state.upload_transform.clone());
    if let Some(description) = description {
        upload = upload.with_description(description);
    }

    let created = app_state
        .photo_service
        .add_photo(&caller.id, &UserId::from(user_id), upload)
        .await?;

    let location = format!("/users/{}/photos/{}", user_id, created.photo.id);
    let body = PhotoResponse::from(created.photo);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response())
}

#[instrument(name = "POST /users/:user_id/photos/:photo_id/setMain", skip(app_state))]
async fn set_main_photo(
    caller: CallerIdentity,
    State(app_state): State<AppState>,
    Path((user_id, photo_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .photo_service
        .set_main_photo(
            &caller.id,
            &UserId::from(user_id),
            &PhotoId::from(photo_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "DELETE /users/:user_id/photos/:photo_id", skip(app_state))]
async fn delete_photo(
    caller: CallerIdentity,
    State(app_state): State<AppState>,
    Path((user_id, photo_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .photo_service
        .delete_photo(
            &caller.id,
            &UserId::from(user_id),
            &PhotoId::from(photo_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Reads the `file` field and the optional `description` field.
async fn extract_photo_from_multipart(
    multipart: &mut Multipart,
) -> Result<(Bytes, Option<String>), ApiError> {
    let mut file = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("failed to parse multipart field"))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("failed to read photo payload"))?;
                file = Some(bytes);
            }
            Some("description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("failed to read photo description"))?;
                if !text.trim().is_empty() {
                    description = Some(text);
                }
            }
            _ => continue,
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("missing photo file field"))?;
    Ok((file, description))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        adapters::outbound::memory::{InMemoryAssetStore, InMemoryPhotoRepository},
        domain::{
            models::UploadTransform,
            services::{PhotoPolicy, PhotoServiceImpl},
        },
    };

    const IDENTITY_HEADER: &str = "x-authenticated-user";
    const BOUNDARY: &str = "photo-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn app() -> Router {
        let service = PhotoServiceImpl::new(
            Arc::new(InMemoryPhotoRepository::new()),
            Arc::new(InMemoryAssetStore::default()),
            PhotoPolicy::default(),
        );
        let state = AppState::new(
            Arc::new(service),
            UploadTransform::default(),
            IDENTITY_HEADER,
        )
        .unwrap();

        Router::new()
            .nest("/users", router(1024 * 1024))
            .with_state(state)
    }

    fn multipart_body(content: &[u8], description: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(description) = description {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\n{description}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(caller: Option<i32>, user_id: i32, content: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/users/{user_id}/photos"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(caller) = caller {
            builder = builder.header(IDENTITY_HEADER, caller.to_string());
        }
        builder
            .body(Body::from(multipart_body(content, Some("at the lake"))))
            .unwrap()
    }

    fn request(method: &str, uri: &str, caller: i32) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(IDENTITY_HEADER, caller.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(app: &Router, user_id: i32) -> i64 {
        let response = app
            .clone()
            .oneshot(upload_request(Some(user_id), user_id, PNG))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn upload_returns_created_with_location() {
        let app = app();

        let response = app
            .clone()
            .oneshot(upload_request(Some(3), 3, PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = json(response).await;
        assert_eq!(location, format!("/users/3/photos/{}", body["id"]));
        assert_eq!(body["isMain"], Value::Bool(true));
        assert_eq!(body["description"], "at the lake");
        assert!(body.get("publicId").is_none());

        let fetched = app
            .oneshot(request("GET", &location, 3))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn upload_without_identity_is_unauthorized() {
        let response = app()
            .oneshot(upload_request(None, 3, PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upload_for_other_user_is_forbidden() {
        let response = app()
            .oneshot(upload_request(Some(4), 3, PNG))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(response).await["code"], "PHOTO_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn empty_upload_is_bad_request() {
        let response = app()
            .oneshot(upload_request(Some(3), 3, b""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "PHOTO_INVALID");
    }

    #[tokio::test]
    async fn set_main_and_delete_flow() {
        let app = app();
        let a = upload(&app, 3).await;
        let b = upload(&app, 3).await;

        let delete_main = app
            .clone()
            .oneshot(request("DELETE", &format!("/users/3/photos/{a}"), 3))
            .await
            .unwrap();
        assert_eq!(delete_main.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(delete_main).await["code"], "PHOTO_IS_MAIN");

        let promote = app
            .clone()
            .oneshot(request("POST", &format!("/users/3/photos/{b}/setMain"), 3))
            .await
            .unwrap();
        assert_eq!(promote.status(), StatusCode::NO_CONTENT);

        let promote_again = app
            .clone()
            .oneshot(request("POST", &format!("/users/3/photos/{b}/setMain"), 3))
            .await
            .unwrap();
        assert_eq!(promote_again.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(promote_again).await["code"], "PHOTO_ALREADY_MAIN");

        let delete_old = app
            .clone()
            .oneshot(request("DELETE", &format!("/users/3/photos/{a}"), 3))
            .await
            .unwrap();
        assert_eq!(delete_old.status(), StatusCode::NO_CONTENT);

        let main = app
            .clone()
            .oneshot(request("GET", "/users/3/main-photo", 3))
            .await
            .unwrap();
        assert_eq!(json(main).await["id"].as_i64(), Some(b));

        let listed = app
            .oneshot(request("GET", "/users/3/photos", 3))
            .await
            .unwrap();
        assert_eq!(json(listed).await.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn foreign_photo_is_forbidden_not_missing() {
        let app = app();
        upload(&app, 3).await;
        let foreign = upload(&app, 4).await;

        let response = app
            .oneshot(request(
                "DELETE",
                &format!("/users/3/photos/{foreign}"),
                3,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_photo_is_not_found() {
        let response = app()
            .oneshot(request("GET", "/users/3/photos/999", 3))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
