use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use thiserror::Error;
use tracing::error;

use convohub_db::{ConstraintKind, constraint_violation};
use convohub_types::api::{Empty, Envelope};

pub type ApiResult<T> = Result<T, ApiError>;

/// Every way a request can fail. Rendered as the standard envelope with
/// empty `data`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Turn a unique-key violation into a conflict with a specific message.
    pub fn conflict_on_unique(err: anyhow::Error, message: &str) -> Self {
        match constraint_violation(&err) {
            Some(ConstraintKind::Unique) => Self::Conflict(message.to_string()),
            _ => Self::from(err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match constraint_violation(&err) {
            Some(ConstraintKind::Unique) => Self::Conflict("Resource already exists.".into()),
            Some(ConstraintKind::ForeignKey) => Self::NotFound("Referenced resource not found.".into()),
            Some(ConstraintKind::Check) => Self::Validation("Value out of range.".into()),
            None => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<TypedHeaderRejection> for ApiError {
    fn from(_: TypedHeaderRejection) -> Self {
        Self::Unauthorized("Authentication credentials were not provided.".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(err) => {
                error!("Request failed: {:#}", err);
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(Envelope::new(Empty {}, message, status.as_u16()))).into_response()
    }
}
