use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{app_state::AppState, domain::models::UserId, routes::ApiError};

/// The caller of a request, as verified by the identity provider in front of
/// this service.
///
/// The provider authenticates the credential and forwards the user id in the
/// configured identity header. Returns 401 Unauthorized if the header is
/// missing or does not hold a user id.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(&state.identity_header)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let id = value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .ok_or_else(|| ApiError::unauthorized("Invalid caller identity"))?;

        Ok(CallerIdentity {
            id: UserId::from(id),
        })
    }
}
