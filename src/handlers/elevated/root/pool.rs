use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::PoolStats;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/root/pools - connection pools currently cached
pub async fn pool_list(State(state): State<AppState>) -> ApiResult<Vec<PoolStats>> {
    Ok(ApiResponse::success(state.db.pool_stats().await))
}

/// DELETE /api/root/pools/:database - close and forget one cached pool
pub async fn pool_evict(
    State(state): State<AppState>,
    Path(database): Path<String>,
) -> ApiResult<Value> {
    if !state.db.evict(&database).await {
        return Err(ApiError::not_found(format!(
            "No cached pool for database '{}'",
            database
        )));
    }

    Ok(ApiResponse::success(json!({ "database": database, "closed": true })))
}
