use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{connection, history, metadata, query, AppState};

/// Create router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/connections",
            get(connection::list_connections).post(connection::create_connection),
        )
        .route("/api/connections/test", post(connection::test_connection))
        .route(
            "/api/connections/{id}",
            get(connection::get_connection)
                .put(connection::update_connection)
                .delete(connection::delete_connection),
        )
        .route(
            "/api/connections/{id}/databases",
            get(metadata::list_databases),
        )
        .route("/api/connections/{id}/tables", get(metadata::list_tables))
        .route("/api/query", post(query::execute_query))
        .route("/api/queries", get(history::list_queries))
        .route("/api/queries/{id}", get(history::get_query))
        .route("/api/queries/{id}/export", get(history::export_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
