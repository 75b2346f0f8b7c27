//! Mapping of core errors onto HTTP responses.
//!
//! Every failure leaves the server as `{"error": "<message>"}`; a 403 also carries the path of
//! the page the caller should be sent to. Store failures are logged in full and reported with a
//! generic message.

use api_shared::ErrorRes;
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use simrs_core::SimrsError;

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug)]
pub struct ApiError(pub SimrsError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<SimrsError> for ApiError {
    fn from(e: SimrsError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SimrsError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SimrsError::Validation(_) => StatusCode::BAD_REQUEST,
            SimrsError::NotFound { .. } => StatusCode::NOT_FOUND,
            SimrsError::BadCredentials | SimrsError::SessionRequired => StatusCode::UNAUTHORIZED,
            SimrsError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let redirect = match &self.0 {
            SimrsError::Forbidden { redirect, .. } => Some(redirect.path().to_string()),
            _ => None,
        };
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request error: {:?}", self.0);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorRes { error, redirect })).into_response()
    }
}

/// `axum::Json` whose rejection renders like every other error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use simrs_core::{Page, Role};

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (SimrsError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                SimrsError::NotFound {
                    entity: "visit",
                    id: "1".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (SimrsError::BadCredentials, StatusCode::UNAUTHORIZED),
            (SimrsError::SessionRequired, StatusCode::UNAUTHORIZED),
            (
                SimrsError::Forbidden {
                    role: Role::Kasir,
                    page: Page::Reports,
                    redirect: Page::Billing,
                },
                StatusCode::FORBIDDEN,
            ),
            (SimrsError::StoreLock, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
