use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    domain::models::{Todo, TodoId, TodoStatus, UserId},
    repositories::{NewTodo, TodoListQuery, TodoPage, TodoRepository, TodoUpdate},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/:user_id", get(list_for_user))
        .route(
            "/:todo_id/user/:user_id",
            patch(update).delete(remove),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateTodoRequest {
    #[validate(length(min = 1, max = 120, message = "title must be 1-120 characters"))]
    title: String,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    description: Option<String>,
    status: Option<TodoStatus>,
    user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 120, message = "title must be 1-120 characters"))]
    title: Option<String>,
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    description: Option<String>,
    status: Option<TodoStatus>,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    body.validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let todo = state
        .todo_repo
        .create(&NewTodo {
            user_id: UserId::new(body.user_id),
            title: body.title,
            description: body.description,
            status: body.status,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(todo)))
}

async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TodoListQuery>,
) -> Result<Json<TodoPage>, ApiError> {
    let page = state
        .todo_repo
        .list_for_user(&UserId::new(user_id), &query)
        .await?;

    Ok(Json(page))
}

async fn update(
    State(state): State<AppState>,
    Path((todo_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    body.validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let todo = state
        .todo_repo
        .update(
            &TodoId::new(todo_id),
            &UserId::new(user_id),
            &TodoUpdate {
                title: body.title,
                description: body.description,
                status: body.status,
            },
        )
        .await?;

    Ok(Json(todo))
}

async fn remove(
    State(state): State<AppState>,
    Path((todo_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Todo>, ApiError> {
    let todo = state
        .todo_repo
        .delete(&TodoId::new(todo_id), &UserId::new(user_id))
        .await?;

    Ok(Json(todo))
}
