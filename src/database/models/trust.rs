use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrustStatus {
    Active,
    Inactive,
    Suspended,
}

impl TrustStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustStatus::Active => "ACTIVE",
            TrustStatus::Inactive => "INACTIVE",
            TrustStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TrustStatus::Active)
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(TrustStatus::Active),
            "INACTIVE" => Ok(TrustStatus::Inactive),
            "SUSPENDED" => Ok(TrustStatus::Suspended),
            other => Err(DatabaseError::InvalidRecord(format!("unknown trust status '{}'", other))),
        }
    }
}

/// A row of the system database's `trusts` registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trust {
    pub id: i64,
    pub trust_name: String,
    pub trust_code: String,
    pub subdomain: String,
    /// Explicit schema name; derived from the trust code when absent
    pub database_name: Option<String>,
    pub status: TrustStatus,
    pub contact_email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Raw row as stored; status is a VARCHAR column
#[derive(Debug, FromRow)]
pub struct TrustRow {
    pub id: i64,
    pub trust_name: String,
    pub trust_code: String,
    pub subdomain: String,
    pub database_name: Option<String>,
    pub status: String,
    pub contact_email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<TrustRow> for Trust {
    type Error = DatabaseError;

    fn try_from(row: TrustRow) -> Result<Self, Self::Error> {
        Ok(Trust {
            id: row.id,
            trust_name: row.trust_name,
            trust_code: row.trust_code,
            subdomain: row.subdomain,
            database_name: row.database_name.filter(|name| !name.trim().is_empty()),
            status: row.status.parse()?,
            contact_email: row.contact_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Registry entry as written by `erp trust import`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrust {
    pub trust_name: String,
    pub trust_code: String,
    /// Defaults to the trust code
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default = "default_status")]
    pub status: TrustStatus,
    #[serde(default)]
    pub contact_email: Option<String>,
}

fn default_status() -> TrustStatus {
    TrustStatus::Active
}

impl NewTrust {
    pub fn subdomain(&self) -> String {
        self.subdomain
            .clone()
            .unwrap_or_else(|| self.trust_code.clone())
            .to_ascii_lowercase()
    }
}
