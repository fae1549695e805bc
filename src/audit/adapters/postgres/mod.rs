//! `PostgreSQL` adapter for audit task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{AuditPgPool, PostgresTaskStore};
