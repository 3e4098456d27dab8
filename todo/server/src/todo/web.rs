use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::todo::{
    CreateTodoInput, DeleteTodoInput, NUL_IN_DESCRIPTION, Todo, TodoRepository, TodoService,
    TodoServiceError, TodoState, UpdateTodoStatusInput,
};

#[derive(Debug, Deserialize)]
pub struct CreateTodoForm {
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusForm {
    status: String,
}

/// Custom error type for todo page handler operations.
#[derive(Debug, thiserror::Error)]
enum TodoPageError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a todo service error.
    #[error("Todo service error")]
    Service(#[from] TodoServiceError),
}

impl IntoResponse for TodoPageError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, user_facing_error_message) = match &self {
            TodoPageError::Service(TodoServiceError::Validation(err)) => {
                let message = match (err.field(), err.reason()) {
                    ("description", NUL_IN_DESCRIPTION) => {
                        "Task descriptions cannot contain null characters."
                    }
                    ("description", _) => "Please enter a task description.",
                    _ => "That status is not recognised.",
                };
                (StatusCode::BAD_REQUEST, message)
            }
            TodoPageError::Service(TodoServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "This task no longer exists.")
            }
            TodoPageError::Service(TodoServiceError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save your changes. Please try again.",
            ),
            TodoPageError::Template(err) => {
                tracing::error!("Failed to render todo page: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later.",
                )
            }
        };

        let error_template = ErrorMessageTemplate::new(user_facing_error_message.to_string());
        let Ok(rendered) = error_template.render() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut response = (status_code, Html(rendered)).into_response();
        // Send the message to the error slot instead of the list
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("hx-retarget"),
            HeaderValue::from_static("#error-message"),
        );
        headers.insert(
            HeaderName::from_static("hx-reswap"),
            HeaderValue::from_static("innerHTML"),
        );
        response.headers_mut().extend(headers);
        response
    }
}

#[derive(Template)]
#[template(path = "todos/index.html")]
struct TodosPageTemplate {
    todos: Vec<Todo>,
    pending_count: usize,
    completed_count: usize,
}

impl TodosPageTemplate {
    pub fn new(todos: Vec<Todo>) -> Self {
        let completed_count = todos.iter().filter(|todo| todo.is_completed()).count();
        Self {
            pending_count: todos.len() - completed_count,
            completed_count,
            todos,
        }
    }
}

#[derive(Template)]
#[template(path = "todos/todo_list.html")]
struct TodoListTemplate {
    todos: Vec<Todo>,
    pending_count: usize,
    completed_count: usize,
}

impl TodoListTemplate {
    pub fn new(todos: Vec<Todo>) -> Self {
        let completed_count = todos.iter().filter(|todo| todo.is_completed()).count();
        Self {
            pending_count: todos.len() - completed_count,
            completed_count,
            todos,
        }
    }
}

#[derive(Template)]
#[template(path = "todos/error_message.html")]
struct ErrorMessageTemplate {
    message: String,
}

impl ErrorMessageTemplate {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// Fetches all todos and renders them as the list fragment.
async fn render_todo_list<R: TodoRepository>(
    todo_service: &TodoService<R>,
) -> Result<Html<String>, TodoPageError> {
    let todos = todo_service.get_todos().await?;
    let template = TodoListTemplate::new(todos);
    template.render().map(Html).map_err(TodoPageError::from)
}

/// Handler for GET / that renders the full todo page.
#[tracing::instrument(skip(state))]
async fn todos_page_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Html<String>, TodoPageError> {
    let todo_service = TodoService::new(&state.db);
    let todos = todo_service.get_todos().await?;
    let template = TodosPageTemplate::new(todos);
    template.render().map(Html).map_err(TodoPageError::from)
}

/// Handler for GET /todos that returns just the list fragment.
#[tracing::instrument(skip(state))]
async fn todo_list_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Html<String>, TodoPageError> {
    let todo_service = TodoService::new(&state.db);
    render_todo_list(&todo_service).await
}

/// Handler for creating a todo via POST request.
///
/// The page trims what was typed before submitting it; the service itself
/// stores descriptions verbatim.
#[tracing::instrument(skip(state))]
async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    Form(form): Form<CreateTodoForm>,
) -> Result<Html<String>, TodoPageError> {
    let todo_service = TodoService::new(&state.db);
    todo_service
        .create_todo(CreateTodoInput::new(form.description.trim()))
        .await?;
    render_todo_list(&todo_service).await
}

/// Handler for PUT /todos/{id}/status that toggles a todo.
#[tracing::instrument(skip(state))]
async fn update_status_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i64>,
    Form(form): Form<UpdateStatusForm>,
) -> Result<Html<String>, TodoPageError> {
    let input = UpdateTodoStatusInput::parse(id, &form.status).map_err(TodoServiceError::from)?;
    let todo_service = TodoService::new(&state.db);
    todo_service.update_todo_status(input).await?;
    render_todo_list(&todo_service).await
}

/// Handler for DELETE /todos/{id}.
///
/// A todo that is already gone is not reported to the user; the refreshed list
/// simply no longer shows it.
#[tracing::instrument(skip(state))]
async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, TodoPageError> {
    let todo_service = TodoService::new(&state.db);
    let outcome = todo_service.delete_todo(DeleteTodoInput::new(id)).await?;
    tracing::debug!("Delete of todo {} succeeded: {}", id, outcome.success);
    render_todo_list(&todo_service).await
}

/// Creates and returns the todo page router.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/", get(todos_page_handler))
        .route("/todos", get(todo_list_handler).post(create_todo_handler))
        .route("/todos/{id}/status", put(update_status_handler))
        .route("/todos/{id}", delete(delete_todo_handler))
        .with_state(state)
}
