//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::pricing::responses::PricingErrorResponse;
use crate::pricing::services::PricingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Pricing(#[from] PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Pricing(err) => match err {
                PricingError::NoSavedState => (StatusCode::NOT_FOUND, "no_saved_state"),
                PricingError::PresetNotFound { .. } => (StatusCode::NOT_FOUND, "preset_not_found"),
                PricingError::InvalidPresetName { .. } => {
                    (StatusCode::BAD_REQUEST, "invalid_preset_name")
                }
                PricingError::CorruptRecord { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_record")
                }
            },
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "template_error"),
            AppError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "export_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        // Server-side failures are logged in full and reported generically
        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            "Something went wrong while processing the price matrix. Please try again.".to_string()
        } else {
            tracing::debug!("{}", self);
            self.to_string()
        };

        let body = PricingErrorResponse {
            error_type: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::from(PricingError::PresetNotFound {
            name: "quarry a".to_string(),
        });
        assert_eq!(err.status_and_type(), (StatusCode::NOT_FOUND, "preset_not_found"));
        assert!(err.to_string().contains("quarry a"));

        let err = AppError::from(PricingError::InvalidPresetName {
            name: " ".to_string(),
            reason: "name is empty".to_string(),
        });
        assert_eq!(err.status_and_type().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_are_generic() {
        let response = AppError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::from(PricingError::CorruptRecord {
            context: "preset".to_string(),
            message: "bad json".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
