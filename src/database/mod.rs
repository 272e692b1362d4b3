pub mod manager;
pub mod models;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager, PoolStats};
pub use models::{NewTrust, Trust, TrustStatus};
pub use store::{MySqlTrustStore, TrustStore};
