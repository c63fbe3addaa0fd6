use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    models::{AssetId, RemoteAsset, UserId},
    ConflictField, ProfileError, ProfileRecord,
};

/// Failure kinds the primary store reports, decoupled from any driver's
/// native error representation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already in use")]
    Conflict(ConflictField),
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for ProfileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::Conflict(field),
            StoreError::NotFound => Self::UserNotFound,
            StoreError::Other(reason) => Self::Persistence(reason),
        }
    }
}

/// Staged changes for a single profile update. Absent fields are left
/// untouched by the store.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<RemoteAsset>,
}

/// The narrow slice of the primary store the profile workflow depends on.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_profile(&self, user_id: &UserId) -> Result<ProfileRecord, StoreError>;

    /// Read the asset id the user currently points at, or None if the user
    /// has no avatar. `NotFound` means the user itself does not exist.
    async fn find_current_asset(&self, user_id: &UserId) -> Result<Option<AssetId>, StoreError>;

    /// Apply the patch as a single conditional update keyed by user id.
    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<ProfileRecord, StoreError>;

    async fn delete_user(&self, user_id: &UserId) -> Result<(), StoreError>;
}
