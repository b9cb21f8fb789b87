use axum::{
    extract::{Path, State},
    Json,
};

use super::connection::{parse_id, AppState};
use crate::api::middleware::AppError;
use crate::models::TableInfo;
use crate::services::QueryError;

/// Driver failures on metadata lookups keep the lookup's own message
fn lookup_error(message: &'static str) -> impl FnOnce(QueryError) -> AppError {
    move |err| match err {
        QueryError::ConnectionFailed(error) => {
            tracing::error!("{}: {}", message, error);
            AppError::DriverConnection {
                message: message.to_string(),
                error,
            }
        }
        QueryError::QueryExecutionFailed(error) => {
            tracing::error!("{}: {}", message, error);
            AppError::DriverExecution {
                message: message.to_string(),
                error,
            }
        }
        other => AppError::from(other),
    }
}

/// Databases visible to the connection's login
pub async fn list_databases(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let id = parse_id(&id, "Invalid connection ID")?;
    let databases = state
        .queries
        .list_databases(id)
        .await
        .map_err(lookup_error("Failed to fetch databases"))?;

    Ok(Json(databases))
}

/// Base tables and views of the connection's database
pub async fn list_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TableInfo>>, AppError> {
    let id = parse_id(&id, "Invalid connection ID")?;
    let tables = state
        .queries
        .list_tables(id)
        .await
        .map_err(lookup_error("Failed to fetch tables"))?;

    tracing::info!("Connection {} reported {} tables", id, tables.len());
    Ok(Json(tables))
}
