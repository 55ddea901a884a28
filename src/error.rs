use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The requested fixture is not part of the current live snapshot.
    #[error("{0}")]
    NoMatchData(String),

    #[error("{0}")]
    Payment(String),

    #[error("Failed to fetch live match data")]
    LiveDataUnavailable,

    #[error("AI model not available. Please train it first!")]
    ModelUnavailable,

    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::NoMatchData(_) => (StatusCode::BAD_REQUEST, "NO_MATCH_DATA"),
            AppError::Payment(_) => (StatusCode::BAD_REQUEST, "PAYMENT_FAILED"),
            AppError::LiveDataUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "LIVE_DATA_UNAVAILABLE")
            }
            AppError::ModelUnavailable => (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_UNAVAILABLE"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                self.to_string()
            }
            AppError::Payment(msg) => {
                tracing::warn!("Payment provider error: {}", msg);
                msg.clone()
            }
            AppError::LiveDataUnavailable | AppError::ModelUnavailable => {
                tracing::error!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_onto_status_codes() {
        assert_eq!(
            AppError::Validation("Missing required fields".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Forbidden("Invalid or expired access code".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("No active subscription found".into()).status(),
            StatusCode::NOT_FOUND
        );
        // Missing fixtures are reported as a bad request, not a 404
        assert_eq!(
            AppError::NoMatchData("No live data found for this match".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Payment("Payment failed. Try again.".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::LiveDataUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_carry_their_message() {
        let err = AppError::Internal(anyhow::anyhow!("classifier exploded"));
        assert_eq!(err.to_string(), "Internal Server Error: classifier exploded");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
