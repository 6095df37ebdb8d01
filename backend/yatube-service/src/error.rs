/// Error types for Yatube Service
///
/// Every fallible operation in the service returns [`AppError`]. The HTTP
/// layer converts it into a JSON error body with the matching status code.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for yatube-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// SQLSTATE for unique constraint violations
const PG_UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for foreign key violations
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced user, post, group or comment does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor does not own the resource it tries to mutate
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uploaded payload is not a decodable raster image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Required field missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate resource (unique constraint)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code used in error bodies and logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidImage(_) => "invalid_image",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) => "database_error",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidImage(_) | AppError::Validation(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => {
                    return AppError::Conflict(db_err.message().to_string())
                }
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return AppError::NotFound(db_err.message().to_string())
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("migration failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
