use crate::todo::{NewTodo, Todo, TodoError, TodoStore};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared state for the todo routes.
#[derive(Clone)]
pub struct TodoState {
    pub store: Arc<dyn TodoStore>,
}

impl TodoState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }
}

/// JSON representation of a Todo for API responses.
#[derive(Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TodoJson {
    /// Unique identifier assigned by the store
    pub id: i32,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id(),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            completed: todo.completed(),
        }
    }
}

/// JSON request payload for creating or updating a todo.
///
/// `completed` is optional on the wire so that an absent field can be told
/// apart from an explicit `false`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TodoPayload {
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
}

impl TodoPayload {
    /// Checks that every field is present and the text fields are non-empty.
    pub fn validate(self) -> Result<NewTodo, ApiError> {
        match (self.title, self.description, self.completed) {
            (Some(title), Some(description), Some(completed))
                if !title.is_empty() && !description.is_empty() =>
            {
                Ok(NewTodo {
                    title,
                    description,
                    completed,
                })
            }
            _ => Err(ApiError::MissingFields),
        }
    }
}

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Custom error type for todo handler operations.
///
/// The `Display` text is what clients see, so it never carries store details.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid todo ID")]
    InvalidId,
    #[error("Invalid request payload")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("Missing required fields")]
    MissingFields,
    #[error("Todo not found")]
    NotFound,
    /// A store failure; the payload is the user-facing message.
    #[error("{0}")]
    Store(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidId | ApiError::InvalidPayload(_) | ApiError::MissingFields => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error = match status_code {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            _ => "INTERNAL_SERVER_ERROR",
        };
        let body = ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

/// Maps a store failure to an API error, logging the underlying cause.
fn store_error(context: &'static str) -> impl FnOnce(TodoError) -> ApiError {
    move |err| match err {
        TodoError::NotFound(id) => {
            tracing::warn!("{}: todo with ID {} not found", context, id);
            ApiError::NotFound
        }
        TodoError::Database(err) => {
            tracing::error!("{}: {}", context, err);
            ApiError::Store(context)
        }
    }
}

/// Path ids that fail to decode are reported the same way as ids that are not integers.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<i32, ApiError> {
    let Path(raw) = path.map_err(|rejection| {
        tracing::warn!("Invalid todo ID in path: {}", rejection.body_text());
        ApiError::InvalidId
    })?;
    raw.parse::<i32>().map_err(|_| {
        tracing::warn!("Invalid todo ID in path: {:?}", raw);
        ApiError::InvalidId
    })
}

fn decode_payload(body: &Bytes) -> Result<TodoPayload, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        tracing::warn!("Invalid request payload: {}", err);
        ApiError::InvalidPayload(err)
    })
}

/// Handler for GET /todos - Returns all todos.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/todos",
    responses(
        (status = 200, description = "Successfully retrieved todos", body = [TodoJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_todos_handler(
    State(state): State<TodoState>,
) -> Result<Json<Vec<TodoJson>>, ApiError> {
    let todos = state
        .store
        .list()
        .await
        .map_err(store_error("Failed to fetch todos"))?;
    Ok(Json(todos.into_iter().map(TodoJson::from).collect()))
}

/// Handler for GET /todo/{id} - Returns a single todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/todo/{id}",
    params(("id" = i32, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Successfully retrieved todo", body = TodoJson),
        (status = 400, description = "Invalid todo ID", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todo_handler(
    State(state): State<TodoState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<TodoJson>, ApiError> {
    let id = parse_id(id)?;
    let todo = state
        .store
        .get(id)
        .await
        .map_err(store_error("Failed to fetch todo"))?;
    Ok(Json(TodoJson::from(todo)))
}

/// Handler for POST /todo/create - Creates a todo.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/todo/create",
    request_body = TodoPayload,
    responses(
        (status = 201, description = "Todo created", body = TodoJson),
        (status = 400, description = "Invalid payload or missing fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<TodoState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TodoJson>), ApiError> {
    let new_todo = decode_payload(&body)?.validate()?;
    let todo = state
        .store
        .create(new_todo)
        .await
        .map_err(store_error("Failed to create todo"))?;
    Ok((StatusCode::CREATED, Json(TodoJson::from(todo))))
}

/// Handler for PUT /todo/update/{id} - Overwrites every mutable field of a todo.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    put,
    path = "/todo/update/{id}",
    params(("id" = i32, Path, description = "Todo ID")),
    request_body = TodoPayload,
    responses(
        (status = 200, description = "Todo updated", body = TodoJson),
        (status = 400, description = "Invalid ID, payload or missing fields", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<TodoState>,
    id: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Json<TodoJson>, ApiError> {
    let id = parse_id(id)?;
    let existing = state
        .store
        .get(id)
        .await
        .map_err(store_error("Failed to fetch todo"))?;

    let changes = decode_payload(&body)?.validate()?;
    let todo = state
        .store
        .update(changes.with_id(existing.id()))
        .await
        .map_err(store_error("Failed to update todo"))?;
    Ok(Json(TodoJson::from(todo)))
}

/// Handler for DELETE /todo/delete/{id} - Deletes a todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/todo/delete/{id}",
    params(("id" = i32, Path, description = "Todo ID")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 400, description = "Invalid todo ID", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<TodoState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(id)?;
    // The store deletes idempotently, so existence is checked here to answer 404.
    let todo = state
        .store
        .get(id)
        .await
        .map_err(store_error("Failed to fetch todo"))?;
    state
        .store
        .delete(todo.id())
        .await
        .map_err(store_error("Failed to delete todo"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for the item routes called without an ID segment.
async fn missing_id_handler() -> ApiError {
    tracing::warn!("Missing todo ID in path");
    ApiError::InvalidId
}

/// Creates and returns the todo router.
pub fn create_todo_router(state: TodoState) -> Router {
    Router::new()
        .route("/todos", get(list_todos_handler))
        .route("/todo/create", post(create_todo_handler))
        .route("/todo/update/{id}", put(update_todo_handler))
        .route("/todo/delete/{id}", delete(delete_todo_handler))
        .route("/todo/{id}", get(get_todo_handler))
        .route("/todo/", get(missing_id_handler))
        .route("/todo/update/", put(missing_id_handler))
        .route("/todo/delete/", delete(missing_id_handler))
        .with_state(state)
}
