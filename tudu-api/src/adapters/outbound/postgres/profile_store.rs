use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{
    models::{AssetId, UserId},
    ports::outbound::{ProfilePatch, ProfileStore, StoreError},
    ConflictField, ProfileRecord,
};

pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate driver errors into the port's tagged failure kinds. Unique
/// violations name the constraint, which carries the conflicting column.
fn map_store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            let field = match db.constraint() {
                Some(name) if name.contains("email") => ConflictField::Email,
                Some(name) if name.contains("username") => ConflictField::Username,
                _ => ConflictField::Other,
            };
            StoreError::Conflict(field)
        }
        _ => StoreError::Other(err.to_string()),
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, user_id: &UserId) -> Result<ProfileRecord, StoreError> {
        sqlx::query_as::<_, ProfileRecord>(
            r#"
            SELECT id, username, email, avatar_url, avatar_asset_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn find_current_asset(&self, user_id: &UserId) -> Result<Option<AssetId>, StoreError> {
        let row: Option<(Option<AssetId>,)> =
            sqlx::query_as("SELECT avatar_asset_id FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_store_error)?;

        row.map(|(asset,)| asset).ok_or(StoreError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<ProfileRecord, StoreError> {
        let (avatar_url, avatar_asset_id) = match &patch.avatar {
            Some(asset) => (Some(asset.url.as_str()), Some(asset.asset_id.as_str())),
            None => (None, None),
        };

        sqlx::query_as::<_, ProfileRecord>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                avatar_url = COALESCE($5, avatar_url),
                avatar_asset_id = COALESCE($6, avatar_asset_id),
                updated_at = now()
            WHERE id = $1
            RETURNING id, username, email, avatar_url, avatar_asset_id
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(patch.username.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.password_hash.as_deref())
        .bind(avatar_url)
        .bind(avatar_asset_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
