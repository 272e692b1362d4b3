pub mod trust_service;

pub use trust_service::{DatabaseInventory, TrustHealth, TrustService};
