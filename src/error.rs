use crate::claim::ClaimError;
use crate::storage::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Stable, machine-readable error kind
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Failure of a streaming request at any stage before or after headers
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Path is invalid")]
    PathInvalid,

    #[error("Range header is not in the correct format")]
    RangeHeaderInvalid,

    #[error("Requested range is not satisfiable")]
    RangeNotSatisfiable,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Missing or invalid session credential")]
    Unauthorized,

    #[error("Not authorized to access this resource")]
    UnauthorizedResource,

    /// A credential was present but could not be accepted (malformed, expired, ...)
    #[error("Credential rejected: {0}")]
    CredentialRejected(#[from] ClaimError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification used for status, body and log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Credential,
    User,
    Server,
}

impl StreamError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StreamError::CredentialRejected(_) => ErrorClass::Credential,
            StreamError::PathInvalid
            | StreamError::RangeHeaderInvalid
            | StreamError::RangeNotSatisfiable
            | StreamError::ResourceNotFound
            | StreamError::Unauthorized
            | StreamError::UnauthorizedResource => ErrorClass::User,
            StreamError::Storage(_) | StreamError::Internal(_) => ErrorClass::Server,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StreamError::PathInvalid => StatusCode::BAD_REQUEST,
            StreamError::RangeHeaderInvalid | StreamError::RangeNotSatisfiable => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            StreamError::ResourceNotFound => StatusCode::NOT_FOUND,
            StreamError::Unauthorized | StreamError::UnauthorizedResource => {
                StatusCode::UNAUTHORIZED
            }
            StreamError::CredentialRejected(_) => StatusCode::FORBIDDEN,
            StreamError::Storage(_) | StreamError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::PathInvalid => "PathInvalidError",
            StreamError::RangeHeaderInvalid => "RangeHeaderInvalidError",
            StreamError::RangeNotSatisfiable => "RangeNotSatisfiableError",
            StreamError::ResourceNotFound => "ResourceNotFoundError",
            StreamError::Unauthorized => "UnauthorizedError",
            StreamError::UnauthorizedResource => "UnauthorizedResourceError",
            StreamError::CredentialRejected(_) => "ForbiddenError",
            StreamError::Storage(_) | StreamError::Internal(_) => "ServerError",
        }
    }

    /// Body sent to the client. Credential and server failures stay generic.
    pub fn to_error_response(&self) -> ErrorResponse {
        let message = match self.class() {
            ErrorClass::User => self.to_string(),
            ErrorClass::Credential => "Access to this resource is forbidden".to_string(),
            ErrorClass::Server => "Internal server error".to_string(),
        };

        ErrorResponse {
            kind: self.kind().to_string(),
            message,
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self.class() {
            ErrorClass::Credential => {
                warn!(error = %self, %status, "Credential error");
            }
            ErrorClass::User => {
                info!(kind = self.kind(), %status, message = %self, "User error");
            }
            ErrorClass::Server => {
                error!(error = ?self, %status, "Server error");
            }
        }

        (status, Json(self.to_error_response())).into_response()
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
