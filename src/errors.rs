use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Validation(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Upstream(String),
    Internal(String),
}

/// JSON body for every error response.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Upstream(msg) => write!(f, "Upstream error: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(msg) => ApiErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(msg.clone()),
            },
            AppError::Unauthorized => ApiErrorResponse {
                error: "Unauthorized".to_string(),
                details: None,
            },
            AppError::Forbidden(msg) => ApiErrorResponse {
                error: "Forbidden".to_string(),
                details: Some(msg.clone()),
            },
            AppError::NotFound(msg) => ApiErrorResponse {
                error: "Not Found".to_string(),
                details: Some(msg.clone()),
            },
            AppError::Conflict(msg) => ApiErrorResponse {
                error: "Conflict".to_string(),
                details: Some(msg.clone()),
            },
            AppError::Upstream(msg) => {
                log::error!("{self}");
                ApiErrorResponse {
                    error: "Upstream service unavailable".to_string(),
                    details: Some(msg.clone()),
                }
            }
            // Storage details never leave the process.
            AppError::Db(_) | AppError::Internal(_) => {
                log::error!("{self}");
                ApiErrorResponse {
                    error: "Internal Server Error".to_string(),
                    details: None,
                }
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration failed: {e}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Upstream("request timed out".to_string())
        } else {
            AppError::Upstream(e.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("Token error: {e}"))
    }
}

/// True when a sqlx error is a PostgreSQL unique-constraint violation.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
