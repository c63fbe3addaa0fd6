use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::{
    domain::{AuthError, ProfileError},
    repositories::RepositoryError,
};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NothingToUpdate => Self::bad_request(err.to_string()),
            ProfileError::UserNotFound => Self::not_found(err.to_string()),
            ProfileError::InvalidImage(_) => Self::bad_request(err.to_string()),
            ProfileError::Conflict(_) => Self::conflict(err.to_string()),
            ProfileError::Processing(ref reason) => {
                tracing::error!("avatar processing failed: {}", reason);
                Self::internal("failed to process image")
            }
            ProfileError::Upload(ref reason) => {
                tracing::error!("avatar upload failed: {}", reason);
                Self::internal("failed to upload image")
            }
            ProfileError::Persistence(ref reason) => {
                // Detail stays in the logs, not in the response.
                tracing::error!("profile update failed: {}", reason);
                Self::internal("failed to update profile")
            }
            ProfileError::Internal(ref reason) => {
                tracing::error!("profile operation failed: {}", reason);
                Self::internal("internal error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized(err.to_string()),
            AuthError::TokenInvalid => Self::unauthorized(err.to_string()),
            AuthError::Internal(ref reason) => {
                tracing::error!("auth operation failed: {}", reason);
                Self::internal("internal error")
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseError(ref e) => {
                tracing::error!("Database error: {:?}", e);
                Self::internal(err.to_string())
            }
            RepositoryError::NotFound(_) => Self::not_found(err.to_string()),
            RepositoryError::Conflict(_) => Self::conflict(err.to_string()),
        }
    }
}
