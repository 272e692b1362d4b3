use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, MySqlTrustStore, TrustStore};
use crate::handlers;
use crate::middleware::{
    require_system_admin_middleware, require_token_middleware, resolve_tenant_middleware,
};
use crate::services::TrustService;
use crate::tenant::TrustRegistry;

/// Shared state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseManager>,
    pub registry: Arc<TrustRegistry>,
    pub trusts: Arc<TrustService>,
}

impl AppState {
    /// Production wiring: trust registry read from the system database
    pub fn from_config(config: AppConfig) -> Self {
        let db = Arc::new(DatabaseManager::new(config.database.clone()));
        let store: Arc<dyn TrustStore> = Arc::new(MySqlTrustStore::new(db.clone()));
        Self::assemble(config, db, store)
    }

    /// Wiring with a caller-supplied registry store
    pub fn with_store(config: AppConfig, store: Arc<dyn TrustStore>) -> Self {
        let db = Arc::new(DatabaseManager::new(config.database.clone()));
        Self::assemble(config, db, store)
    }

    fn assemble(config: AppConfig, db: Arc<DatabaseManager>, store: Arc<dyn TrustStore>) -> Self {
        let ttl = Duration::from_secs(config.tenancy.trust_cache_ttl_secs);
        let registry = Arc::new(TrustRegistry::new(store, ttl));
        let trusts = Arc::new(TrustService::new(db.clone(), registry.clone()));

        Self {
            config: Arc::new(config),
            db,
            registry,
            trusts,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Resolved tenant
        .merge(tenant_routes(state.clone()))
        // Platform operators on the system domain
        .merge(root_routes(state.clone()))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn tenant_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/tenant/health", get(handlers::protected::tenant::tenant_health))
        .route_layer(from_fn_with_state(state.clone(), require_token_middleware))
        .route("/api/tenant", get(handlers::protected::tenant::tenant_show))
        .route_layer(from_fn_with_state(state, resolve_tenant_middleware))
}

fn root_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::root;

    Router::new()
        .route("/api/root/trusts", get(root::trust::trust_list))
        .route("/api/root/trusts/health", get(root::trust::trust_health_all))
        .route("/api/root/trusts/:code", get(root::trust::trust_show))
        .route("/api/root/trusts/:code/health", get(root::trust::trust_health))
        .route("/api/root/trusts/:code/status", put(root::trust::trust_status))
        .route("/api/root/pools", get(root::pool::pool_list))
        .route("/api/root/pools/:database", delete(root::pool::pool_evict))
        .route("/api/root/databases", get(root::database::database_inventory))
        // Layers run bottom-up: resolve the host, then check the operator token
        .route_layer(from_fn_with_state(state.clone(), require_system_admin_middleware))
        .route_layer(from_fn_with_state(state, resolve_tenant_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}
