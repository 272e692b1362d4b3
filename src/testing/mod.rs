//! In-memory fixtures shared by unit and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::database::{DatabaseError, NewTrust, Trust, TrustStatus, TrustStore};

/// Build a registry row without touching a database
pub fn trust_fixture(id: i64, code: &str, status: TrustStatus) -> Trust {
    let now = Utc::now().naive_utc();
    Trust {
        id,
        trust_name: format!("{} Trust", code),
        trust_code: code.to_string(),
        subdomain: code.to_string(),
        database_name: None,
        status,
        contact_email: Some(format!("admin@{}.school", code)),
        created_at: now,
        updated_at: now,
    }
}

/// [`TrustStore`] backed by a vector, counting subdomain lookups
pub struct MemoryTrustStore {
    trusts: Mutex<Vec<Trust>>,
    lookups: AtomicUsize,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self {
            trusts: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_trusts(trusts: &[(&str, TrustStatus)]) -> Self {
        let store = Self::new();
        {
            let mut rows = store.trusts.lock().unwrap();
            for (i, (code, status)) in trusts.iter().enumerate() {
                rows.push(trust_fixture(i as i64 + 1, code, *status));
            }
        }
        store
    }

    /// Number of `find_by_subdomain` calls that reached the store
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTrustStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrustStore for MemoryTrustStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Trust>, DatabaseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let rows = self.trusts.lock().unwrap();
        Ok(rows.iter().find(|t| t.subdomain == subdomain).cloned())
    }

    async fn find_by_code(&self, trust_code: &str) -> Result<Option<Trust>, DatabaseError> {
        let rows = self.trusts.lock().unwrap();
        Ok(rows.iter().find(|t| t.trust_code == trust_code).cloned())
    }

    async fn list(&self) -> Result<Vec<Trust>, DatabaseError> {
        let mut rows = self.trusts.lock().unwrap().clone();
        rows.sort_by(|a, b| a.trust_code.cmp(&b.trust_code));
        Ok(rows)
    }

    async fn set_status(
        &self,
        trust_code: &str,
        status: TrustStatus,
    ) -> Result<Option<Trust>, DatabaseError> {
        let mut rows = self.trusts.lock().unwrap();
        Ok(rows.iter_mut().find(|t| t.trust_code == trust_code).map(|t| {
            t.status = status;
            t.updated_at = Utc::now().naive_utc();
            t.clone()
        }))
    }

    async fn upsert(&self, new: &NewTrust) -> Result<Trust, DatabaseError> {
        let mut rows = self.trusts.lock().unwrap();
        let now = Utc::now().naive_utc();

        if let Some(existing) = rows.iter_mut().find(|t| t.trust_code == new.trust_code) {
            existing.trust_name = new.trust_name.clone();
            existing.subdomain = new.subdomain();
            existing.database_name = new.database_name.clone();
            existing.status = new.status;
            existing.contact_email = new.contact_email.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let trust = Trust {
            id: rows.len() as i64 + 1,
            trust_name: new.trust_name.clone(),
            trust_code: new.trust_code.clone(),
            subdomain: new.subdomain(),
            database_name: new.database_name.clone(),
            status: new.status,
            contact_email: new.contact_email.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(trust.clone());
        Ok(trust)
    }
}
