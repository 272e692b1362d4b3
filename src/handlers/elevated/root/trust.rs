use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{Trust, TrustStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::TrustHealth;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TrustStatus,
}

/// GET /api/root/trusts
pub async fn trust_list(State(state): State<AppState>) -> ApiResult<Vec<Trust>> {
    let trusts = state.registry.list().await?;
    Ok(ApiResponse::success(trusts))
}

/// GET /api/root/trusts/health - every active trust, checked concurrently
pub async fn trust_health_all(State(state): State<AppState>) -> ApiResult<Vec<TrustHealth>> {
    let reports = state.trusts.health_all().await?;
    Ok(ApiResponse::success(reports))
}

/// GET /api/root/trusts/:code
pub async fn trust_show(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Trust> {
    let trust = find_trust(&state, &code).await?;
    Ok(ApiResponse::success(trust))
}

/// GET /api/root/trusts/:code/health
pub async fn trust_health(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<TrustHealth> {
    let trust = find_trust(&state, &code).await?;
    let report = state.trusts.health(&trust).await;

    if report.reachable {
        Ok(ApiResponse::success(report))
    } else {
        Ok(ApiResponse::with_status(report, StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// PUT /api/root/trusts/:code/status
///
/// Leaving ACTIVE also closes the trust's cached pool so open connections
/// do not outlive the suspension.
pub async fn trust_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Value> {
    let trust = state
        .registry
        .set_status(&code, request.status)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Trust '{}' not found", code)))?;

    let mut pool_closed = false;
    if !trust.status.is_active() {
        pool_closed = state.db.evict(&state.db.trust_database_name(&trust)).await;
    }

    tracing::info!(
        "Trust '{}' set to {} by '{}'",
        trust.trust_code,
        trust.status,
        user.subject
    );

    Ok(ApiResponse::success(json!({
        "trust": trust,
        "pool_closed": pool_closed,
    })))
}

async fn find_trust(state: &AppState, code: &str) -> Result<Trust, ApiError> {
    state
        .registry
        .find_by_code(code)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Trust '{}' not found", code)))
}
