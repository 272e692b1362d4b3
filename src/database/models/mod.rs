pub mod trust;

pub use trust::{NewTrust, Trust, TrustStatus};
