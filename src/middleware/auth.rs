use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{authorize, bearer_token, validate_token, Claims, Role, TokenError, TokenScope};
use crate::error::ApiError;
use crate::tenant::TenantContext;

/// Authenticated caller, injected after the token passed the domain check
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: String,
    pub scope: TokenScope,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            scope: claims.scope,
            role: claims.role,
        }
    }
}

/// Bearer token middleware. Requires the tenant resolver to have run first.
pub async fn require_token_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&state, &request)?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Like [`require_token_middleware`], restricted to platform operators on the
/// system domain
pub async fn require_system_admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&state, &request)?;
    if auth_user.role != Role::SystemAdmin {
        tracing::warn!("'{}' ({}) attempted a system admin operation", auth_user.subject, auth_user.role);
        return Err(TokenError::InsufficientRole(auth_user.role).into());
    }
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

fn authenticate(state: &AppState, request: &Request) -> Result<AuthUser, ApiError> {
    let context = request
        .extensions()
        .get::<TenantContext>()
        .ok_or_else(|| ApiError::internal_server_error("Tenant resolution required before authentication"))?;

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| TokenError::Malformed("Invalid Authorization header format".to_string())))
        .transpose()?;

    let token = bearer_token(header_value)?;
    let claims = validate_token(token, &state.config.security)?;

    authorize(&claims, context).map_err(|e| {
        tracing::warn!(
            "Rejected token for '{}' scoped to {} on {} domain: {}",
            claims.sub,
            claims.scope,
            TokenScope::for_context(context),
            e
        );
        e
    })?;

    Ok(AuthUser::from(claims))
}
