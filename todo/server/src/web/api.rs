use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::todo::TodoState;
use crate::todo::api::v1;

/// OpenAPI description of the JSON API.
#[derive(OpenApi)]
#[openapi(
    paths(
        v1::get_todos_handler,
        v1::create_todo_handler,
        v1::update_todo_status_handler,
        v1::delete_todo_handler,
    ),
    components(schemas(
        v1::TodoJson,
        v1::CreateTodoRequest,
        v1::UpdateTodoStatusRequest,
        v1::DeleteTodoResponse,
        v1::ErrorResponse,
        crate::todo::TodoStatus,
    )),
    tags((name = "Todos", description = "Create, list, toggle and delete todos"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(todo_state: Arc<TodoState>) -> Router {
    Router::new().nest("/api/v1", v1::create_api_router(todo_state))
}
