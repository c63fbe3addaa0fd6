use std::fmt;

use serde::Serialize;

use crate::domain::models::{AssetId, UserId};

/// Full user row, including the credential hash.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub avatar_asset_id: Option<AssetId>,
}

/// Safe to log — the password hash is redacted.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("avatar_url", &self.avatar_url)
            .field("avatar_asset_id", &self.avatar_asset_id)
            .finish()
    }
}

/// What the primary store hands back after a profile read or update.
/// `avatar_asset_id` is a weak reference into the blob store's namespace —
/// the store records the pointer, it does not own the blob's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub avatar_asset_id: Option<AssetId>,
}

/// The outward profile projection returned by the user endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar: Option<AvatarRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarRef {
    pub url: String,
}

impl From<ProfileRecord> for ProfileResponse {
    fn from(record: ProfileRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            avatar: record.avatar_url.map(|url| AvatarRef { url }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn profile_without_avatar_serializes_a_null_avatar() {
        let response: ProfileResponse = ProfileRecord {
            id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: None,
            avatar_asset_id: None,
        }
        .into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["avatar"], serde_json::Value::Null);
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn avatar_projection_exposes_only_the_url() {
        let response: ProfileResponse = ProfileRecord {
            id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar_url: Some("https://blobs.example/a.webp".to_string()),
            avatar_asset_id: Some(AssetId::from("avatars/a")),
        }
        .into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["avatar"]["url"], "https://blobs.example/a.webp");
        // The asset id is a storage handle, not part of the API surface.
        assert!(json["avatar"].get("assetId").is_none());
    }

    #[test]
    fn debug_output_redacts_the_password_hash() {
        let user = User {
            id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
            avatar_url: None,
            avatar_asset_id: None,
        };

        let debug = format!("{user:?}");
        assert!(!debug.contains("$2b$10$"));
        assert!(debug.contains("[redacted]"));
    }
}
