use std::fmt;

use thiserror::Error;

/// Which unique column a conflicting write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Username,
    Email,
    Other,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Email => write!(f, "email"),
            Self::Other => write!(f, "value"),
        }
    }
}

/// Errors that can occur during profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("nothing to update")]
    NothingToUpdate,
    #[error("user not found")]
    UserNotFound,
    #[error("not a valid image: {0}")]
    InvalidImage(String),
    #[error("failed to process image: {0}")]
    Processing(String),
    #[error("failed to upload avatar: {0}")]
    Upload(String),
    #[error("{0} already in use")]
    Conflict(ConflictField),
    #[error("failed to persist profile: {0}")]
    Persistence(String),
    #[error("{0}")]
    Internal(String),
}

/// Errors from validating or re-encoding an uploaded image.
///
/// `Invalid` is the expected adversarial case (the bytes are not a real
/// image) and maps to a client error; `Transcode` means a decodable image
/// could not be re-encoded and is a processing fault.
#[derive(Debug, Error)]
pub enum AvatarProcessingError {
    #[error("invalid image: {0}")]
    Invalid(String),
    #[error("failed to transcode image: {0}")]
    Transcode(String),
}

impl From<AvatarProcessingError> for ProfileError {
    fn from(err: AvatarProcessingError) -> Self {
        match err {
            AvatarProcessingError::Invalid(reason) => Self::InvalidImage(reason),
            AvatarProcessingError::Transcode(reason) => Self::Processing(reason),
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email or password is incorrect")]
    InvalidCredentials,
    #[error("invalid or missing token")]
    TokenInvalid,
    #[error("{0}")]
    Internal(String),
}
