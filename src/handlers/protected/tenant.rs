use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{DatabaseError, DatabaseManager};
use crate::middleware::{ApiResponse, AuthUser};
use crate::tenant::TenantContext;

/// GET /api/tenant - what the request host resolved to
pub async fn tenant_show(Extension(context): Extension<TenantContext>) -> ApiResponse<Value> {
    ApiResponse::success(context.to_json())
}

/// GET /api/tenant/health - connectivity of the resolved tenant's database
///
/// Responds 503 with the report as data when the database is unreachable.
pub async fn tenant_health(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Extension(user): Extension<AuthUser>,
) -> ApiResponse<Value> {
    tracing::debug!("Tenant health requested by '{}' ({})", user.subject, user.scope);

    let (reachable, report) = match &context {
        TenantContext::Trust(trust) => {
            let health = state.trusts.health(trust).await;
            (health.reachable, json!(health))
        }
        TenantContext::System => {
            let database = state.db.system_database();
            let check = async {
                let pool = state.db.pool_for(&context).await?;
                let latency = DatabaseManager::ping(&pool).await?;
                let tables = DatabaseManager::table_count(&pool).await?;
                Ok::<_, DatabaseError>((latency, tables))
            };
            match check.await {
                Ok((latency, tables)) => (
                    true,
                    json!({
                        "database": database,
                        "reachable": true,
                        "latency_ms": latency.as_millis(),
                        "table_count": tables,
                    }),
                ),
                Err(e) => (
                    false,
                    json!({
                        "database": database,
                        "reachable": false,
                        "error": e.to_string(),
                    }),
                ),
            }
        }
    };

    if reachable {
        ApiResponse::success(report)
    } else {
        ApiResponse::with_status(report, StatusCode::SERVICE_UNAVAILABLE)
    }
}
