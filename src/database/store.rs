use std::sync::Arc;

use async_trait::async_trait;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::trust::TrustRow;
use crate::database::models::{NewTrust, Trust, TrustStatus};

/// Storage behind the trust registry
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Trust>, DatabaseError>;

    async fn find_by_code(&self, trust_code: &str) -> Result<Option<Trust>, DatabaseError>;

    async fn list(&self) -> Result<Vec<Trust>, DatabaseError>;

    /// Returns the updated trust, or `None` when the code is unknown
    async fn set_status(
        &self,
        trust_code: &str,
        status: TrustStatus,
    ) -> Result<Option<Trust>, DatabaseError>;

    /// Insert a trust or update the existing row with the same code
    async fn upsert(&self, trust: &NewTrust) -> Result<Trust, DatabaseError>;
}

const TRUST_COLUMNS: &str = "id, trust_name, trust_code, subdomain, database_name, status, \
                             contact_email, created_at, updated_at";

/// `trusts` table in the system database
pub struct MySqlTrustStore {
    db: Arc<DatabaseManager>,
}

impl MySqlTrustStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Trust>, DatabaseError> {
        let pool = self.db.system_pool().await?;

        let query = format!(
            "SELECT {} FROM trusts WHERE {} = ? AND deleted_at IS NULL",
            TRUST_COLUMNS, column
        );
        let row = sqlx::query_as::<_, TrustRow>(&query)
            .bind(value)
            .fetch_optional(&pool)
            .await?;

        row.map(Trust::try_from).transpose()
    }
}

#[async_trait]
impl TrustStore for MySqlTrustStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Trust>, DatabaseError> {
        self.fetch_one_by("subdomain", subdomain).await
    }

    async fn find_by_code(&self, trust_code: &str) -> Result<Option<Trust>, DatabaseError> {
        self.fetch_one_by("trust_code", trust_code).await
    }

    async fn list(&self) -> Result<Vec<Trust>, DatabaseError> {
        let pool = self.db.system_pool().await?;

        let query = format!(
            "SELECT {} FROM trusts WHERE deleted_at IS NULL ORDER BY trust_code",
            TRUST_COLUMNS
        );
        let rows = sqlx::query_as::<_, TrustRow>(&query).fetch_all(&pool).await?;

        rows.into_iter().map(Trust::try_from).collect()
    }

    async fn set_status(
        &self,
        trust_code: &str,
        status: TrustStatus,
    ) -> Result<Option<Trust>, DatabaseError> {
        let pool = self.db.system_pool().await?;

        sqlx::query(
            "UPDATE trusts SET status = ?, updated_at = NOW()
             WHERE trust_code = ? AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .bind(trust_code)
        .execute(&pool)
        .await?;

        // MySQL reports zero affected rows when the status is unchanged
        self.find_by_code(trust_code).await
    }

    async fn upsert(&self, trust: &NewTrust) -> Result<Trust, DatabaseError> {
        if let Some(name) = &trust.database_name {
            if !self.db.is_valid_db_name(name) {
                return Err(DatabaseError::InvalidDatabaseName(name.clone()));
            }
        }

        let pool = self.db.system_pool().await?;

        sqlx::query(
            "INSERT INTO trusts
                (trust_name, trust_code, subdomain, database_name, status, contact_email,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, NOW(), NOW())
             ON DUPLICATE KEY UPDATE
                trust_name = VALUES(trust_name),
                subdomain = VALUES(subdomain),
                database_name = VALUES(database_name),
                status = VALUES(status),
                contact_email = VALUES(contact_email),
                deleted_at = NULL,
                updated_at = NOW()",
        )
        .bind(&trust.trust_name)
        .bind(&trust.trust_code)
        .bind(trust.subdomain())
        .bind(&trust.database_name)
        .bind(trust.status.as_str())
        .bind(&trust.contact_email)
        .execute(&pool)
        .await?;

        self.find_by_code(&trust.trust_code)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("trust '{}'", trust.trust_code)))
    }
}
