use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::repos::RepoError,
    domain::slug::SlugError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures of the content services.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },
    #[error("invalid slug: {0}")]
    InvalidSlug(#[from] SlugError),
    #[error("slug `{slug}` is already in use")]
    DuplicateSlug { slug: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ContentError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        const SOURCE: &str = "application::error::repo_error_to_http";
        let (status, message) = match &error {
            RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Duplicate record"),
            RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
            RepoError::Integrity { .. } => {
                (StatusCode::CONFLICT, "Integrity constraint violated")
            }
            RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
            RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Persistence error"),
        };
        HttpError::from_error(SOURCE, status, message, &error)
    }
}

impl From<ContentError> for HttpError {
    fn from(error: ContentError) -> Self {
        const SOURCE: &str = "application::error::content_error_to_http";
        match error {
            ContentError::NotFound { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            ContentError::InvalidSlug(_) => {
                HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid slug", &error)
            }
            ContentError::DuplicateSlug { .. } => {
                HttpError::from_error(SOURCE, StatusCode::CONFLICT, "Duplicate slug", &error)
            }
            ContentError::Validation(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            ContentError::Repo(err) => HttpError::from(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
