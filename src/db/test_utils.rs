//! Shared test utilities for database operations
//!
//! Provides a common test_pool() that creates an in-memory database with
//! the full schema, so tests run against the same tables as production.

use sqlx::SqlitePool;

use super::Database;

/// Create an in-memory test database pool with full schema
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None, 1)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}
