use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant::{request_host, resolve_host, HostError, TenantContext};

/// Middleware that maps the request host to a trust (or the system domain)
/// and injects the resulting [`TenantContext`] into request extensions
pub async fn resolve_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenancy = &state.config.tenancy;

    let host = request_host(request.headers(), request.uri(), tenancy.trust_proxy_headers)
        .ok_or(HostError::MissingHost)?;

    let scope = resolve_host(&host, tenancy).map_err(|e| {
        tracing::warn!("Host resolution failed for '{}': {}", host, e);
        e
    })?;

    let context = state.registry.resolve(&scope).await.map_err(|e| {
        tracing::warn!("Tenant resolution failed for '{}': {}", host, e);
        e
    })?;

    match &context {
        TenantContext::System => tracing::debug!("Resolved host '{}' to system domain", host),
        TenantContext::Trust(trust) => {
            tracing::debug!("Resolved host '{}' to trust '{}'", host, trust.trust_code)
        }
    }

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
