use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("store error: {0}")]
    Store(DbErr),
}

impl PayrollError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<DbErr> for PayrollError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict(detail),
            _ => Self::Store(e),
        }
    }
}

impl actix_web::error::ResponseError for PayrollError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        let body = match self {
            PayrollError::Store(e) => {
                error!(error = %e, "request failed on the store");
                "internal server error".to_string()
            },
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Conflict(_) => StatusCode::CONFLICT,
            PayrollError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            PayrollError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
