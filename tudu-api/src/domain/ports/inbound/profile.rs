use async_trait::async_trait;

use crate::domain::{
    models::{UploadCandidate, UserId},
    ProfileError, ProfileResponse,
};

/// A profile update as assembled by the routing layer: any subset of the
/// text fields plus an optional raw image upload.
#[derive(Debug, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<UploadCandidate>,
}

impl UpdateProfileRequest {
    pub fn has_changes(&self) -> bool {
        self.username.is_some()
            || self.email.is_some()
            || self.password.is_some()
            || self.image.is_some()
    }
}

#[async_trait]
pub trait ProfileService: Send + Sync + 'static {
    async fn get_profile(&self, user_id: &UserId) -> Result<ProfileResponse, ProfileError>;

    async fn update_profile(
        &self,
        user_id: &UserId,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, ProfileError>;

    async fn delete_account(&self, user_id: &UserId) -> Result<(), ProfileError>;
}
