use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::DatabaseInventory;

/// GET /api/root/databases - registry rows reconciled against server schemas
pub async fn database_inventory(State(state): State<AppState>) -> ApiResult<DatabaseInventory> {
    let inventory = state.trusts.inventory().await?;
    Ok(ApiResponse::success(inventory))
}
