// handlers/elevated/mod.rs - platform administration
//
// Only reachable on the system domain with a SYSTEM_ADMIN token; trust hosts
// never see these routes succeed.
pub mod root;
