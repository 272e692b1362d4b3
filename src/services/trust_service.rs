use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::database::{DatabaseError, DatabaseManager, Trust};
use crate::tenant::TrustRegistry;

/// Connectivity report for one trust database
#[derive(Debug, Clone, Serialize)]
pub struct TrustHealth {
    pub trust_code: String,
    pub database: String,
    pub reachable: bool,
    pub latency_ms: Option<u128>,
    pub table_count: Option<i64>,
    pub error: Option<String>,
}

/// Trust registry compared against the schemas present on the server
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseInventory {
    /// Registered trusts whose schema exists
    pub provisioned: Vec<String>,
    /// Registered trusts with no schema on the server
    pub missing_schema: Vec<String>,
    /// Trust-prefixed schemas no registry row points at
    pub orphaned_schemas: Vec<String>,
}

pub struct TrustService {
    db: Arc<DatabaseManager>,
    registry: Arc<TrustRegistry>,
}

impl TrustService {
    pub fn new(db: Arc<DatabaseManager>, registry: Arc<TrustRegistry>) -> Self {
        Self { db, registry }
    }

    /// Check that a trust's database accepts connections and count its tables
    pub async fn health(&self, trust: &Trust) -> TrustHealth {
        let database = self.db.trust_database_name(trust);
        let mut report = TrustHealth {
            trust_code: trust.trust_code.clone(),
            database,
            reachable: false,
            latency_ms: None,
            table_count: None,
            error: None,
        };

        let check = async {
            let pool = self.db.trust_pool(trust).await?;
            let latency = DatabaseManager::ping(&pool).await?;
            let tables = DatabaseManager::table_count(&pool).await?;
            Ok::<_, DatabaseError>((latency, tables))
        };

        match check.await {
            Ok((latency, tables)) => {
                report.reachable = true;
                report.latency_ms = Some(latency.as_millis());
                report.table_count = Some(tables);
            }
            Err(e) => {
                warn!("Health check failed for trust '{}': {}", trust.trust_code, e);
                report.error = Some(e.to_string());
            }
        }

        report
    }

    /// Health of every active trust, checked concurrently
    pub async fn health_all(&self) -> Result<Vec<TrustHealth>, DatabaseError> {
        let trusts = self.registry.list().await?;
        let checks = trusts
            .iter()
            .filter(|t| t.status.is_active())
            .map(|t| self.health(t));
        Ok(join_all(checks).await)
    }

    pub async fn inventory(&self) -> Result<DatabaseInventory, DatabaseError> {
        let trusts = self.registry.list().await?;
        let schemas = self.db.list_trust_databases().await?;
        Ok(self.reconcile(&trusts, schemas))
    }

    fn reconcile(&self, trusts: &[Trust], schemas: Vec<String>) -> DatabaseInventory {
        let mut remaining: BTreeSet<String> = schemas.into_iter().collect();
        let mut inventory = DatabaseInventory::default();

        for trust in trusts {
            let database = self.db.trust_database_name(trust);
            if remaining.remove(&database) {
                inventory.provisioned.push(trust.trust_code.clone());
            } else {
                inventory.missing_schema.push(trust.trust_code.clone());
            }
        }
        inventory.orphaned_schemas = remaining.into_iter().collect();

        inventory
    }
}
