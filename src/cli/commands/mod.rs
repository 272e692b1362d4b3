pub mod db;
pub mod resolve;
pub mod server;
pub mod token;
pub mod trust;
