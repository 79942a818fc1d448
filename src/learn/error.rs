use axum::{response::IntoResponse, Json};
use uuid::Uuid;

use super::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    #[error("Invalid quiz: {0}")]
    InvalidQuiz(String),
    #[error("Course {0} is not complete")]
    CourseNotComplete(Uuid),
    #[error("Certificate not found: {0}")]
    CertificateNotFound(String),
    #[error("Certificate download failed: {0}")]
    DownloadFailed(String),
    #[error("Progress write failed: {0}")]
    PersistenceWriteFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Event queue unavailable: {0}")]
    QueueUnavailable(String),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl LearnError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidQuiz(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CourseNotComplete(_) => StatusCode::CONFLICT,
            Self::CertificateNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::QueueUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DownloadFailed(_) | Self::PersistenceWriteFailed(_) | Self::Backend(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for LearnError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}
