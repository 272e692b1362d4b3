// handlers/mod.rs - three security tiers
//
// Public (no resolution) → Protected (resolved tenant, optional token)
// → Elevated (system domain, SYSTEM_ADMIN token)
pub mod elevated;
pub mod protected;
pub mod public;
