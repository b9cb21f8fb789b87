use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::connection::{json_body, AppState};
use crate::api::middleware::AppError;
use crate::models::{ExecuteQueryRequest, TabularResult};

/// Execute SQL against a saved connection. Every call lands in the history.
pub async fn execute_query(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteQueryRequest>, JsonRejection>,
) -> Result<Json<TabularResult>, AppError> {
    let request = json_body(payload)?;
    if request.query.trim().is_empty() {
        return Err(AppError::Validation(
            "Validation error: Query is required at \"query\"".to_string(),
        ));
    }

    let result = state
        .queries
        .execute(request.connection_id, request.query)
        .await?;

    Ok(Json(result))
}
