use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::database::{DatabaseError, NewTrust, Trust, TrustStatus, TrustStore};
use crate::tenant::{HostScope, TenantContext, TenantError};

/// Entries are pruned of expired lookups once the map reaches this size
const PRUNE_THRESHOLD: usize = 1024;

/// Hard bound on cached lookups; beyond it results are served uncached
const MAX_CACHED_LOOKUPS: usize = 10_000;

struct CachedLookup {
    trust: Option<Trust>,
    fetched_at: Instant,
}

#[derive(Default)]
struct LookupCache {
    entries: HashMap<String, CachedLookup>,
    /// Bumped by every invalidation. A lookup that started under an older
    /// generation must not write its result back.
    generation: u64,
}

/// Trust lookups by subdomain, with a short-lived cache in front of the store.
///
/// Misses are cached too, so probing random subdomains does not hit the
/// system database on every request.
pub struct TrustRegistry {
    store: Arc<dyn TrustStore>,
    ttl: Duration,
    cache: RwLock<LookupCache>,
}

impl TrustRegistry {
    pub fn new(store: Arc<dyn TrustStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(LookupCache::default()),
        }
    }

    /// Turn a host scope into a request tenant context
    pub async fn resolve(&self, scope: &HostScope) -> Result<TenantContext, TenantError> {
        let subdomain = match scope {
            HostScope::System => return Ok(TenantContext::System),
            HostScope::Trust(subdomain) => subdomain,
        };

        let trust = self
            .find_by_subdomain(subdomain)
            .await?
            .ok_or_else(|| TenantError::UnknownTrust(subdomain.clone()))?;

        if !trust.status.is_active() {
            return Err(TenantError::TrustInactive {
                code: trust.trust_code,
                status: trust.status.to_string(),
            });
        }

        Ok(TenantContext::Trust(trust))
    }

    pub async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Trust>, DatabaseError> {
        if self.ttl.is_zero() {
            return self.store.find_by_subdomain(subdomain).await;
        }

        let generation = {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.entries.get(subdomain) {
                if hit.fetched_at.elapsed() < self.ttl {
                    return Ok(hit.trust.clone());
                }
            }
            cache.generation
        };

        let trust = self.store.find_by_subdomain(subdomain).await?;
        debug!("Trust lookup for subdomain '{}': found={}", subdomain, trust.is_some());

        let mut cache = self.cache.write().await;
        if cache.generation != generation {
            debug!("Registry changed during lookup of '{}'; result not cached", subdomain);
            return Ok(trust);
        }

        if cache.entries.len() >= PRUNE_THRESHOLD {
            let ttl = self.ttl;
            cache.entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        }
        if cache.entries.len() < MAX_CACHED_LOOKUPS || cache.entries.contains_key(subdomain) {
            cache.entries.insert(
                subdomain.to_string(),
                CachedLookup {
                    trust: trust.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        Ok(trust)
    }

    pub async fn find_by_code(&self, trust_code: &str) -> Result<Option<Trust>, DatabaseError> {
        self.store.find_by_code(trust_code).await
    }

    pub async fn list(&self) -> Result<Vec<Trust>, DatabaseError> {
        self.store.list().await
    }

    pub async fn set_status(
        &self,
        trust_code: &str,
        status: TrustStatus,
    ) -> Result<Option<Trust>, DatabaseError> {
        let updated = self.store.set_status(trust_code, status).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn upsert(&self, trust: &NewTrust) -> Result<Trust, DatabaseError> {
        let saved = self.store.upsert(trust).await?;
        self.invalidate().await;
        Ok(saved)
    }

    /// Drop every cached lookup
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.entries.clear();
        cache.generation += 1;
    }
}
