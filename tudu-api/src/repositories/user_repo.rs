use sqlx::PgPool;

use crate::domain::User;

use super::repo_error::RepositoryError;

pub trait UserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn conflicting_fields(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<&'static str>, RepositoryError>;
}

pub struct UserRepositoryImpl {
    pool: PgPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for UserRepositoryImpl {
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, avatar_url, avatar_asset_id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                RepositoryError::Conflict("username or email".to_string())
            }
            _ => RepositoryError::DatabaseError(err),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar_url, avatar_asset_id
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Which of the requested username/email are already taken. Used to turn
    /// a bare unique violation into a message naming the offending fields.
    async fn conflicting_fields(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<&'static str>, RepositoryError> {
        let existing: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT username, email
            FROM users
            WHERE username = $1 OR email = $2
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        let mut taken = Vec::new();
        if existing.iter().any(|(name, _)| name == username) {
            taken.push("username");
        }
        if existing.iter().any(|(_, mail)| mail == email) {
            taken.push("email");
        }

        Ok(taken)
    }
}

pub struct NewUser {
    username: String,
    email: String,
    password_hash: String,
}

impl NewUser {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            username,
            email,
            password_hash,
        }
    }
}
