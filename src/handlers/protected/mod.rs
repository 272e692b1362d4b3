// handlers/protected/mod.rs - handlers behind tenant resolution
pub mod tenant;
