use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::RequestStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Request is already {from}, cannot mark it {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("{0}")]
    Conflict(String),

    /// The store could not be reached; safe to retry.
    #[error("Messaging is temporarily unavailable")]
    Unavailable(#[source] StoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for MessagingError {
    fn from(err: StoreError) -> Self {
        match err {
            e if e.is_infrastructure() => MessagingError::Unavailable(e),
            StoreError::NotFound => MessagingError::NotFound("Record"),
            StoreError::Rejected(reason) => MessagingError::Forbidden(reason),
            other => MessagingError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MessagingError>;

impl IntoResponse for MessagingError {
    fn into_response(self) -> Response {
        let status = match &self {
            MessagingError::Validation(_) => StatusCode::BAD_REQUEST,
            MessagingError::Forbidden(_) => StatusCode::FORBIDDEN,
            MessagingError::NotFound(_) => StatusCode::NOT_FOUND,
            MessagingError::InvalidTransition { .. } | MessagingError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            MessagingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MessagingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            MessagingError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
