//! JSON error responses.
//!
//! Every failure leaves the API as `{error: true, status_code, message}`.
//! Internal details are logged, never returned.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use verification::VerificationError;

use crate::documents::DocumentError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("{0}")]
    BadRequest(String),

    #[error("request timed out")]
    Timeout,

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: bool,
    status_code: u16,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Verification(VerificationError::NoCitationsFound) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Verification(_) => StatusCode::BAD_REQUEST,
            Self::Document(DocumentError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Document(DocumentError::Unsupported(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Document(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(e) = &self {
            tracing::error!(error = ?e, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: true,
            status_code: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("invalid multipart body: {}", e))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let too_many = ApiError::from(VerificationError::TooManyCitations { count: 101, max: 100 });
        assert_eq!(too_many.status_code(), StatusCode::BAD_REQUEST);

        let pdf = ApiError::from(DocumentError::Unsupported("PDF".into()));
        assert_eq!(pdf.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let internal = ApiError::Internal(anyhow::anyhow!("db exploded"));
        assert_eq!(internal.to_string(), "internal server error");
    }
}
