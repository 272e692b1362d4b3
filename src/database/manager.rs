use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::database::models::Trust;
use crate::tenant::TenantContext;

/// MySQL identifier limit
const MAX_DB_NAME_LEN: usize = 64;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

struct PoolEntry {
    pool: MySqlPool,
    created_at: DateTime<Utc>,
}

/// Snapshot of one cached pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub database: String,
    pub size: u32,
    pub idle: usize,
    pub created_at: DateTime<Utc>,
}

/// Connection pool cache for the system database and every trust database.
///
/// Holds at most one pool per database name. Pools are built on first use
/// and live until evicted or [`DatabaseManager::close_all`] runs.
pub struct DatabaseManager {
    settings: DatabaseConfig,
    pools: RwLock<HashMap<String, PoolEntry>>,
}

impl DatabaseManager {
    pub fn new(settings: DatabaseConfig) -> Self {
        Self {
            settings,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn system_database(&self) -> &str {
        &self.settings.system_database
    }

    /// Get system database pool
    pub async fn system_pool(&self) -> Result<MySqlPool, DatabaseError> {
        let name = self.settings.system_database.clone();
        self.get_pool(&name).await
    }

    /// Get the pool backing a trust
    pub async fn trust_pool(&self, trust: &Trust) -> Result<MySqlPool, DatabaseError> {
        let name = self.trust_database_name(trust);
        self.get_pool(&name).await
    }

    /// Get the pool for whatever a request resolved to
    pub async fn pool_for(&self, context: &TenantContext) -> Result<MySqlPool, DatabaseError> {
        match context {
            TenantContext::System => self.system_pool().await,
            TenantContext::Trust(trust) => self.trust_pool(trust).await,
        }
    }

    /// Schema name for a trust: explicit `database_name`, else prefix + code
    pub fn trust_database_name(&self, trust: &Trust) -> String {
        match &trust.database_name {
            Some(name) => name.clone(),
            None => self.derived_database_name(&trust.trust_code),
        }
    }

    pub fn derived_database_name(&self, trust_code: &str) -> String {
        format!(
            "{}{}",
            self.settings.trust_database_prefix,
            trust_code.to_ascii_lowercase().replace('-', "_")
        )
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, database_name: &str) -> Result<MySqlPool, DatabaseError> {
        if !self.is_valid_db_name(database_name) {
            return Err(DatabaseError::InvalidDatabaseName(database_name.to_string()));
        }

        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(entry) = pools.get(database_name) {
                return Ok(entry.pool.clone());
            }
        }

        let connection_string = self.build_connection_string(database_name)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .min_connections(self.settings.min_connections)
            .acquire_timeout(Duration::from_secs(self.settings.connection_timeout))
            .idle_timeout(Some(Duration::from_secs(self.settings.idle_timeout)))
            .connect(&connection_string)
            .await?;

        Ok(self.cache_pool(database_name, pool).await)
    }

    /// Store a freshly built pool, or close it when another request already
    /// cached one for the same database. Returns the pool that stays cached.
    async fn cache_pool(&self, database_name: &str, pool: MySqlPool) -> MySqlPool {
        let mut pools = self.pools.write().await;
        if let Some(existing) = pools.get(database_name) {
            let existing = existing.pool.clone();
            drop(pools);
            pool.close().await;
            debug!("Discarded duplicate pool for: {}", database_name);
            return existing;
        }

        pools.insert(
            database_name.to_string(),
            PoolEntry {
                pool: pool.clone(),
                created_at: Utc::now(),
            },
        );

        info!("Created database pool for: {}", database_name);
        pool
    }

    pub fn build_connection_string(&self, database_name: &str) -> Result<String, DatabaseError> {
        let base = self
            .settings
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    /// Pings the system pool to ensure connectivity
    pub async fn health_check(&self) -> Result<Duration, DatabaseError> {
        let pool = self.system_pool().await?;
        Self::ping(&pool).await
    }

    /// Round-trip a trivial query and report the latency
    pub async fn ping(pool: &MySqlPool) -> Result<Duration, DatabaseError> {
        let started = Instant::now();
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(started.elapsed())
    }

    /// Number of tables in the database a pool points at
    pub async fn table_count(pool: &MySqlPool) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.TABLES WHERE TABLE_SCHEMA = DATABASE()",
        )
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Schemas on the server that carry the trust prefix
    pub async fn list_trust_databases(&self) -> Result<Vec<String>, DatabaseError> {
        let pool = self.system_pool().await?;
        let prefix = &self.settings.trust_database_prefix;

        // `_` is a LIKE wildcard, so the prefix is re-checked exactly below
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA
             WHERE SCHEMA_NAME LIKE ? ORDER BY SCHEMA_NAME",
        )
        .bind(format!("{}%", prefix))
        .fetch_all(&pool)
        .await?;

        Ok(names
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| name.starts_with(prefix.as_str()))
            .collect())
    }

    /// Remove and close the pool for one database. Returns whether one existed.
    pub async fn evict(&self, database_name: &str) -> bool {
        let entry = self.pools.write().await.remove(database_name);
        match entry {
            Some(entry) => {
                entry.pool.close().await;
                info!("Evicted database pool: {}", database_name);
                true
            }
            None => false,
        }
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let drained: Vec<(String, PoolEntry)> = self.pools.write().await.drain().collect();
        for (name, entry) in drained {
            entry.pool.close().await;
            info!("Closed database pool: {}", name);
        }
    }

    pub async fn pool_stats(&self) -> Vec<PoolStats> {
        let pools = self.pools.read().await;
        let mut stats: Vec<PoolStats> = pools
            .iter()
            .map(|(name, entry)| PoolStats {
                database: name.clone(),
                size: entry.pool.size(),
                idle: entry.pool.num_idle(),
                created_at: entry.created_at,
            })
            .collect();
        stats.sort_by(|a, b| a.database.cmp(&b.database));
        stats
    }

    pub async fn is_cached(&self, database_name: &str) -> bool {
        self.pools.read().await.contains_key(database_name)
    }

    /// Validate database names to prevent injection and tenant mix-ups. Accepts:
    /// - exactly the system database name
    /// - the trust prefix followed by [a-zA-Z0-9_]+
    pub fn is_valid_db_name(&self, name: &str) -> bool {
        if name.len() > MAX_DB_NAME_LEN {
            return false;
        }
        if name == self.settings.system_database {
            return true;
        }
        match name.strip_prefix(self.settings.trust_database_prefix.as_str()) {
            Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            None => false,
        }
    }
}
