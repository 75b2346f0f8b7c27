use crate::error::ApiError;
use crate::AppState;
use api_shared::bearer_token;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use simrs_core::{Session, SimrsError};

/// The caller's session, restored from the `Authorization: Bearer` header.
///
/// Handlers that take this extractor reject anonymous requests with 401 before running.
pub struct CurrentSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header).ok_or(SimrsError::SessionRequired)?;
        Ok(Self(state.sessions.restore(token)?))
    }
}
