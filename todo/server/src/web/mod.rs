use axum::Router;
use axum::http::HeaderName;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config;
use crate::todo::TodoState;
use crate::todo::web::create_todo_router;

pub mod api;

/// Builds the application router: the todo page, the JSON API, the OpenAPI
/// document and the health check.
pub fn create_app(db: sea_orm::DatabaseConnection) -> Router {
    let todo_state = Arc::new(TodoState { db: Arc::new(db) });

    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_todo_router(todo_state.clone()))
        .merge(api::create_api_router(todo_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().expose_headers([
                    HeaderName::from_static("hx-retarget"),
                    HeaderName::from_static("hx-reswap"),
                ])),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    axum::serve(listener, create_app(db)).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn can_check_health_endpoint() {
        let app = create_app(sea_orm::DatabaseConnection::Disconnected);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn can_serve_openapi_document() {
        let app = create_app(sea_orm::DatabaseConnection::Disconnected);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let document: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(document["paths"]["/api/v1/todos"]["get"].is_object());
        assert!(document["paths"]["/api/v1/todos/{id}"]["patch"].is_object());
        assert!(document["paths"]["/api/v1/todos/{id}"]["delete"].is_object());
    }
}
