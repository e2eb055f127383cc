//! HTTP error mapping for handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hub_catalog_core::error::HubError;
use serde_json::json;

/// Handler error; renders as `{ "error": message }` with the mapped status.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AppError(#[from] pub HubError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn message(&self) -> String {
        match &self.0 {
            HubError::NotFound(m)
            | HubError::Conflict(m)
            | HubError::Forbidden(m)
            | HubError::Unauthenticated(m)
            | HubError::InvalidInput(m)
            | HubError::IdentityProvider(m) => m.clone(),
            HubError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            HubError::Internal(e) => tracing::error!(error = ?e, "request failed"),
            HubError::IdentityProvider(m) => {
                tracing::warn!(error = %m, "identity provider failure")
            }
            other => tracing::debug!(status = status.as_u16(), error = %other, "request rejected"),
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
