// handlers/public/mod.rs - endpoints that need neither a resolved tenant nor a token

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "School ERP",
            "version": version,
            "description": "Host-routed gateway over per-trust school databases",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "tenant": "/api/tenant (resolved from host)",
                "tenant_health": "/api/tenant/health (token scoped to the host's trust)",
                "root": "/api/root/* (system domain, SYSTEM_ADMIN token)",
            }
        }
    }))
}

/// GET /health - system database connectivity
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(latency) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "latency_ms": latency.as_millis(),
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
