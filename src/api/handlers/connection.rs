use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{ConnectionPatch, ConnectionProfile, NewConnection};
use crate::services::database::DatabaseDriver;
use crate::services::QueryService;
use crate::storage::Store;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queries: QueryService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            queries: QueryService::new(store.clone(), driver),
            store,
        }
    }
}

/// Parses a numeric path id, answering 400 with `message` otherwise
pub fn parse_id(raw: &str, message: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(message.to_string()))
}

/// Unwraps a JSON body, turning malformed input into a 400 with the
/// deserializer's message
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// List all connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionProfile>>, AppError> {
    let connections = state
        .store
        .list_connections()
        .await
        .map_err(AppError::storage("Failed to fetch connections"))?;

    Ok(Json(connections))
}

/// Get a connection by ID
pub async fn get_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionProfile>, AppError> {
    let id = parse_id(&id, "Invalid connection ID")?;
    let connection = state
        .store
        .get_connection(id)
        .await
        .map_err(AppError::storage("Failed to fetch connection"))?
        .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;

    Ok(Json(connection))
}

/// Create a new connection profile
pub async fn create_connection(
    State(state): State<AppState>,
    payload: Result<Json<NewConnection>, JsonRejection>,
) -> Result<(StatusCode, Json<ConnectionProfile>), AppError> {
    let new = json_body(payload)?;
    new.validate().map_err(AppError::Validation)?;

    let connection = state
        .store
        .create_connection(new)
        .await
        .map_err(AppError::storage("Failed to create connection"))?;

    tracing::info!(
        "Created connection {} ({}) to {} on {}",
        connection.id,
        connection.name,
        connection.database,
        connection.server
    );

    Ok((StatusCode::CREATED, Json(connection)))
}

/// Replace the supplied fields of a connection profile
pub async fn update_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ConnectionPatch>, JsonRejection>,
) -> Result<Json<ConnectionProfile>, AppError> {
    let id = parse_id(&id, "Invalid connection ID")?;
    let patch = json_body(payload)?;

    // The merged profile must still be usable
    let mut merged = state
        .store
        .get_connection(id)
        .await
        .map_err(AppError::storage("Failed to update connection"))?
        .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;
    merged.apply(patch.clone());
    merged.validate().map_err(AppError::Validation)?;

    let connection = state
        .store
        .update_connection(id, patch)
        .await
        .map_err(AppError::storage("Failed to update connection"))?
        .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))?;

    tracing::info!("Updated connection {}", id);
    Ok(Json(connection))
}

/// Delete a connection. Its query history is left in place.
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, "Invalid connection ID")?;
    let deleted = state
        .store
        .delete_connection(id)
        .await
        .map_err(AppError::storage("Failed to delete connection"))?;

    if !deleted {
        tracing::warn!("Attempted to delete unknown connection {}", id);
        return Err(AppError::NotFound("Connection not found".to_string()));
    }

    tracing::info!("Deleted connection {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Try to open a session with unsaved connection details
pub async fn test_connection(
    State(state): State<AppState>,
    payload: Result<Json<NewConnection>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let new = json_body(payload)?;
    new.validate().map_err(AppError::Validation)?;

    state.queries.test_connection(new).await.map_err(|e| {
        tracing::error!("Connection test failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "message": "Connection successful"
    })))
}
