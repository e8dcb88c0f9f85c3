use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::domain::{InvalidState, PhotoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PhotoAccessDenied,
    PhotoNotFound,
    PhotoInvalid,
    PhotoAlreadyMain,
    PhotoIsMain,
    PhotoStorageFailure,
    PhotoConflict,
    PhotoPersistenceFailure,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<ErrorCode>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PhotoError> for ApiError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::Denied => {
                Self::forbidden(err.to_string()).with_code(ErrorCode::PhotoAccessDenied)
            }
            PhotoError::NotFound => {
                Self::not_found(err.to_string()).with_code(ErrorCode::PhotoNotFound)
            }
            PhotoError::Validation(message) => {
                Self::bad_request(message).with_code(ErrorCode::PhotoInvalid)
            }
            PhotoError::InvalidState(state) => {
                let code = match state {
                    InvalidState::AlreadyMain => ErrorCode::PhotoAlreadyMain,
                    InvalidState::MainPhotoDeletion => ErrorCode::PhotoIsMain,
                };
                Self::bad_request(state.to_string()).with_code(code)
            }
            PhotoError::Storage(ref e) => {
                tracing::error!("Photo storage failure: {}", e);
                Self::new(StatusCode::BAD_GATEWAY, "photo storage is unavailable")
                    .with_code(ErrorCode::PhotoStorageFailure)
            }
            PhotoError::Persistence(ref e) if e.is_conflict() => {
                tracing::warn!("Photo commit conflict: {}", e);
                Self::conflict("photo collection changed, please retry")
                    .with_code(ErrorCode::PhotoConflict)
            }
            PhotoError::Persistence(ref e) => {
                tracing::error!("Photo persistence failure: {}", e);
                Self::internal("could not save photo changes")
                    .with_code(ErrorCode::PhotoPersistenceFailure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetStoreError, PersistenceError};
    use crate::domain::models::UserId;

    #[test]
    fn photo_errors_map_to_statuses() {
        let cases = [
            (PhotoError::Denied, StatusCode::FORBIDDEN),
            (PhotoError::NotFound, StatusCode::NOT_FOUND),
            (PhotoError::validation("empty"), StatusCode::BAD_REQUEST),
            (InvalidState::AlreadyMain.into(), StatusCode::BAD_REQUEST),
            (InvalidState::MainPhotoDeletion.into(), StatusCode::BAD_REQUEST),
            (
                AssetStoreError::Unavailable("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PersistenceError::Conflict(UserId::new(1)).into(),
                StatusCode::CONFLICT,
            ),
            (
                PersistenceError::backend("disk full").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn invalid_state_carries_specific_code() {
        let err = ApiError::from(PhotoError::from(InvalidState::MainPhotoDeletion));
        assert_eq!(err.code, Some(ErrorCode::PhotoIsMain));
        assert_eq!(err.message, "you cannot delete your main photo");
    }
}
