use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<racectl_core::Error> for AppError {
    fn from(err: racectl_core::Error) -> Self {
        match err {
            racectl_core::Error::NotFound(message) => Self::NotFound(message),
            racectl_core::Error::Conflict(message) => Self::Conflict(message),
            racectl_core::Error::Invalid(message) => Self::BadRequest(message),
            other => {
                tracing::error!(error = %other, "Unhandled service error");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let err: AppError = racectl_core::Error::Conflict("Bib number already in use".into()).into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = racectl_core::Error::NotFound("Race 9 not found".into()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = racectl_core::Error::Invalid("Race name is required".into()).into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = racectl_core::Error::Offline.into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
