use crate::todo::{
    CreateTodoInput, DeleteOutcome, DeleteTodoInput, Todo, TodoService, TodoServiceError,
    TodoState, TodoStatus, UpdateTodoStatusInput,
};
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Todo for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodoJson {
    /// Store-assigned identifier
    pub id: i32,
    /// The task text, exactly as submitted
    pub description: String,
    /// Current status of the task
    pub status: TodoStatus,
    /// Creation time assigned by the store
    pub created_at: DateTime<Utc>,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id(),
            description: todo.description().to_string(),
            status: todo.status(),
            created_at: todo.created_at(),
        }
    }
}

/// Request body for creating a todo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTodoRequest {
    /// The task text; must contain at least one non-whitespace character
    pub description: String,
}

/// Request body for changing the status of a todo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTodoStatusRequest {
    /// Either `pending` or `completed`
    pub status: String,
}

/// API response for a delete request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteTodoResponse {
    /// Whether a todo was removed
    pub success: bool,
}

impl From<DeleteOutcome> for DeleteTodoResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            success: outcome.success,
        }
    }
}

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable description
    pub message: String,
}

/// Error returned by the todo API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service rejected or failed the operation.
    #[error(transparent)]
    Service(#[from] TodoServiceError),
    /// The request body was not the expected JSON shape.
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error, message) = match &self {
            ApiError::Service(TodoServiceError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
            }
            ApiError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                rejection.body_text(),
            ),
            ApiError::Service(err @ TodoServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            ApiError::Service(TodoServiceError::Storage(err)) => {
                tracing::error!("Todo store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Could not reach the todo store. Please try again later.".to_string(),
                )
            }
        };

        (
            status_code,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// Handler for GET /api/v1/todos - Returns all todos, newest first.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/todos",
    responses(
        (status = 200, description = "All todos, newest first", body = Vec<TodoJson>),
        (status = 500, description = "The store could not be reached", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<Vec<TodoJson>>, ApiError> {
    let service = TodoService::new(&state.db);
    let todos = service.get_todos().await?;
    Ok(Json(todos.into_iter().map(TodoJson::from).collect()))
}

/// Handler for POST /api/v1/todos - Creates a new pending todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Todo created", body = TodoJson),
        (status = 400, description = "Description is empty or the body is malformed", body = ErrorResponse),
        (status = 500, description = "The todo could not be saved", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoJson>), ApiError> {
    let Json(request) = payload?;
    let service = TodoService::new(&state.db);
    let todo = service
        .create_todo(CreateTodoInput::new(request.description))
        .await?;
    Ok((StatusCode::CREATED, Json(TodoJson::from(todo))))
}

/// Handler for PATCH /api/v1/todos/{id} - Sets the status of a todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/v1/todos/{id}",
    params(
        ("id" = i64, Path, description = "ID of the todo to update")
    ),
    request_body = UpdateTodoStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TodoJson),
        (status = 400, description = "Unknown status value or malformed body", body = ErrorResponse),
        (status = 404, description = "No todo with this ID", body = ErrorResponse),
        (status = 500, description = "The change could not be saved", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_status_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateTodoStatusRequest>, JsonRejection>,
) -> Result<Json<TodoJson>, ApiError> {
    let Json(request) = payload?;
    let input = UpdateTodoStatusInput::parse(id, &request.status).map_err(TodoServiceError::from)?;
    let service = TodoService::new(&state.db);
    let todo = service.update_todo_status(input).await?;
    Ok(Json(TodoJson::from(todo)))
}

/// Handler for DELETE /api/v1/todos/{id} - Deletes a todo if it exists.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/todos/{id}",
    params(
        ("id" = i64, Path, description = "ID of the todo to delete")
    ),
    responses(
        (status = 200, description = "Whether a todo was removed", body = DeleteTodoResponse),
        (status = 500, description = "The deletion could not be saved", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteTodoResponse>, ApiError> {
    let service = TodoService::new(&state.db);
    let outcome = service.delete_todo(DeleteTodoInput::new(id)).await?;
    Ok(Json(DeleteTodoResponse::from(outcome)))
}

/// Creates and returns the todos API router.
pub fn create_api_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todos", get(get_todos_handler).post(create_todo_handler))
        .route(
            "/todos/{id}",
            patch(update_todo_status_handler).delete(delete_todo_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::ValidationError;
    use sea_orm::DbErr;

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn maps_validation_error_to_bad_request() {
        let error = ApiError::from(TodoServiceError::from(ValidationError::new(
            "description",
            "cannot be empty",
        )));

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body.error, "VALIDATION_ERROR");
        assert_eq!(body.message, "description cannot be empty");
    }

    #[tokio::test]
    async fn maps_not_found_to_404() {
        let response = ApiError::from(TodoServiceError::NotFound(999)).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = error_body(response).await;
        assert_eq!(body.error, "NOT_FOUND");
        assert_eq!(body.message, "Todo with id 999 not found");
    }

    #[tokio::test]
    async fn maps_missing_field_to_bad_request() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let rejection = <Json<CreateTodoRequest> as axum::extract::FromRequest<()>>::from_request(
            request,
            &(),
        )
        .await
        .unwrap_err();

        let response = ApiError::from(rejection).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body.error, "VALIDATION_ERROR");
        assert!(body.message.contains("description"));
    }

    #[tokio::test]
    async fn hides_storage_error_details() {
        let error = TodoServiceError::Storage(DbErr::Custom("password rejected".to_string()));

        let response = ApiError::from(error).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = error_body(response).await;
        assert_eq!(body.error, "STORAGE_ERROR");
        assert!(!body.message.contains("password"));
    }
}
