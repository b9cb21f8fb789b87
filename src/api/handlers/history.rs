use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use super::connection::{parse_id, AppState};
use crate::api::middleware::AppError;
use crate::models::{QueryListParams, QueryRecord};
use crate::services::CsvExporter;

/// History records in execution order, optionally for one connection
pub async fn list_queries(
    State(state): State<AppState>,
    Query(params): Query<QueryListParams>,
) -> Result<Json<Vec<QueryRecord>>, AppError> {
    let connection_id = params
        .connection_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_id(raw, "Invalid connection ID"))
        .transpose()?;

    let queries = state
        .store
        .list_queries(connection_id)
        .await
        .map_err(AppError::storage("Failed to fetch queries"))?;

    Ok(Json(queries))
}

pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueryRecord>, AppError> {
    let id = parse_id(&id, "Invalid query ID")?;
    Ok(Json(load_query(&state, id).await?))
}

/// The recorded result of a query as a CSV download
pub async fn export_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Invalid query ID")?;
    let record = load_query(&state, id).await?;
    let file = CsvExporter::export(&record.results.unwrap_or_default())?;

    tracing::info!("Exporting results of query {} as {}", id, file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.body,
    ))
}

async fn load_query(state: &AppState, id: i64) -> Result<QueryRecord, AppError> {
    state
        .store
        .get_query(id)
        .await
        .map_err(AppError::storage("Failed to fetch query"))?
        .ok_or_else(|| AppError::NotFound("Query not found".to_string()))
}
