pub mod host;
pub mod registry;

use serde_json::{json, Value};
use thiserror::Error;

use crate::database::{DatabaseError, Trust};

pub use host::{request_host, resolve_host, HostError, HostScope};
pub use registry::TrustRegistry;

#[derive(Debug, Error)]
pub enum TenantError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Unknown trust '{0}'")]
    UnknownTrust(String),

    #[error("Trust '{code}' is not active ({status})")]
    TrustInactive { code: String, status: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Which database a request is bound to, injected by the resolver middleware
#[derive(Debug, Clone)]
pub enum TenantContext {
    System,
    Trust(Trust),
}

impl TenantContext {
    /// Client-safe description (no database names)
    pub fn to_json(&self) -> Value {
        match self {
            TenantContext::System => json!({ "scope": "system" }),
            TenantContext::Trust(trust) => json!({
                "scope": "trust",
                "trust_code": trust.trust_code,
                "trust_name": trust.trust_name,
                "subdomain": trust.subdomain,
            }),
        }
    }
}
