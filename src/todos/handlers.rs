use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::AuthUser,
    error::{ApiError, AppJson},
    state::AppState,
    todos::{
        dto::{CreateTodoRequest, TodoListResponse, UpdateTodoRequest},
        repo_types::Todo,
    },
    validation::parse_id,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("todo not found".into())
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos = state.todos.list_by_owner(auth.id).await?;
    Ok(Json(TodoListResponse { todos }))
}

#[instrument(skip(state, body))]
pub async fn create_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let new_todo = body.into_new_todo()?;
    let todo = state.todos.create(auth.id, new_todo).await?;
    info!(user_id = auth.id, todo_id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state))]
pub async fn get_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    let todo = state
        .todos
        .get_owned(id, auth.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(todo))
}

#[instrument(skip(state, body))]
pub async fn update_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_id): Path<String>,
    AppJson(body): AppJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    let patch = body.into_patch()?;
    let todo = state
        .todos
        .update_partial(id, auth.id, patch)
        .await?
        .ok_or_else(not_found)?;
    info!(user_id = auth.id, todo_id = todo.id, "todo updated");
    Ok(Json(todo))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    if !state.todos.delete_owned(id, auth.id).await? {
        return Err(not_found());
    }
    info!(user_id = auth.id, todo_id = id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
