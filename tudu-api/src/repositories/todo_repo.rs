use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::domain::models::{Todo, TodoId, TodoStatus, UserId};

use super::repo_error::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug)]
pub struct NewTodo {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Default)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoListQuery {
    pub sort: Option<SortOrder>,
    pub status: Option<TodoStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TodoListQuery {
    /// Clamp pagination to sane bounds: page >= 1, 1 <= limit <= 100,
    /// newest-first unless asked otherwise.
    fn normalized(&self) -> (i64, i64, SortOrder) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, 100);
        let sort = self.sort.unwrap_or(SortOrder::Desc);
        (page, limit, sort)
    }
}

fn total_pages(total_data: i64, limit: i64) -> i64 {
    (total_data + limit - 1) / limit
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPage {
    pub page: i64,
    pub limit: i64,
    pub total_data: i64,
    pub total_pages: i64,
    pub sort: SortOrder,
    pub status: Option<TodoStatus>,
    pub data: Vec<Todo>,
}

pub trait TodoRepository {
    async fn create(&self, todo: &NewTodo) -> Result<Todo, RepositoryError>;
    async fn list_for_user(
        &self,
        user_id: &UserId,
        query: &TodoListQuery,
    ) -> Result<TodoPage, RepositoryError>;
    async fn update(
        &self,
        todo_id: &TodoId,
        user_id: &UserId,
        update: &TodoUpdate,
    ) -> Result<Todo, RepositoryError>;
    async fn delete(&self, todo_id: &TodoId, user_id: &UserId) -> Result<Todo, RepositoryError>;
}

pub struct TodoRepositoryImpl {
    pool: PgPool,
}

impl TodoRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_todo_error(err: sqlx::Error, user_id: &UserId) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            RepositoryError::NotFound(format!("user {user_id} not found"))
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            RepositoryError::Conflict("title".to_string())
        }
        _ => RepositoryError::DatabaseError(err),
    }
}

impl TodoRepository for TodoRepositoryImpl {
    async fn create(&self, todo: &NewTodo) -> Result<Todo, RepositoryError> {
        sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (user_id, title, description, status)
            VALUES ($1, $2, $3, COALESCE($4, 'PENDING'::todo_status))
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(todo.user_id.as_uuid())
        .bind(&todo.title)
        .bind(todo.description.as_deref())
        .bind(todo.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_todo_error(err, &todo.user_id))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        query: &TodoListQuery,
    ) -> Result<TodoPage, RepositoryError> {
        let (page, limit, sort) = query.normalized();
        let offset = (page - 1) * limit;

        let user_exists: Option<(UserId,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if user_exists.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "user {user_id} not found"
            )));
        }

        let total_data: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM todos
            WHERE user_id = $1 AND ($2::todo_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let data = sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM todos
            WHERE user_id = $1 AND ($2::todo_status IS NULL OR status = $2)
            ORDER BY created_at {}
            LIMIT $3 OFFSET $4
            "#,
            sort.as_sql()
        ))
        .bind(user_id.as_uuid())
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(TodoPage {
            page,
            limit,
            total_data,
            total_pages: total_pages(total_data, limit),
            sort,
            status: query.status,
            data,
        })
    }

    async fn update(
        &self,
        todo_id: &TodoId,
        user_id: &UserId,
        update: &TodoUpdate,
    ) -> Result<Todo, RepositoryError> {
        sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                status = COALESCE($5, status),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(todo_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_todo_error(err, user_id))?
        .ok_or_else(|| {
            RepositoryError::NotFound("todo not found or not owned by user".to_string())
        })
    }

    async fn delete(&self, todo_id: &TodoId, user_id: &UserId) -> Result<Todo, RepositoryError> {
        sqlx::query_as::<_, Todo>(
            r#"
            DELETE FROM todos
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(todo_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::NotFound("todo not found or not owned by user".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_falls_back_to_defaults() {
        let (page, limit, sort) = TodoListQuery::default().normalized();

        assert_eq!((page, limit), (1, 10));
        assert_eq!(sort, SortOrder::Desc);
    }

    #[test]
    fn out_of_range_pagination_is_clamped() {
        let query = TodoListQuery {
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        let (page, limit, _) = query.normalized();

        assert_eq!((page, limit), (1, 100));
    }

    #[test]
    fn total_pages_round_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
