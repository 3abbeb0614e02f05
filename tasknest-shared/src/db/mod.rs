/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health check
/// - `migrations`: embedded sqlx migration runner
///
/// Models live in the `models` module at the crate root.

pub mod pool;
pub mod migrations;
