pub mod auth;
pub mod resolve_tenant;
pub mod response;

pub use auth::{require_system_admin_middleware, require_token_middleware, AuthUser};
pub use resolve_tenant::resolve_tenant_middleware;
pub use response::{ApiResponse, ApiResult};
