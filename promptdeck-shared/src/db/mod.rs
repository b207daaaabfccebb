/// Database layer for Promptdeck
///
/// Connection pooling and migrations. The domain-facing storage API lives in
/// the `store` module at crate root; this layer only knows about Postgres.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Database migration runner
pub mod migrations;
pub mod pool;
