pub mod database; // GET /api/root/databases
pub mod pool; // GET /api/root/pools, DELETE /api/root/pools/:database
pub mod trust; // /api/root/trusts[/:code[/health|/status]]
