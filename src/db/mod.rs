//! Database module - SQLite schema for combats and their initiative rosters

#[cfg(test)]
pub mod test_utils;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>, max_connections: u32) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        // foreign_keys is per-connection in SQLite; cascades depend on it
        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS combats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                session_id TEXT,
                phase TEXT NOT NULL DEFAULT 'setup'
                    CHECK (phase IN ('setup', 'active', 'ended')),
                round INTEGER NOT NULL DEFAULT 1,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                outcome TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS initiatives (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                combat_id INTEGER NOT NULL REFERENCES combats(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                initiative_roll INTEGER NOT NULL,
                armor_class INTEGER NOT NULL,
                damage_taken INTEGER NOT NULL DEFAULT 0,
                max_hp INTEGER NOT NULL,
                is_player BOOLEAN NOT NULL DEFAULT 0,
                conditions TEXT,
                notes TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // At most one active combat, and one active turn per combat
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_combats_single_active ON combats(is_active) WHERE is_active = 1",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_initiatives_single_turn ON initiatives(combat_id) WHERE is_active = 1",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_initiatives_combat ON initiatives(combat_id, sort_order)",
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = Database::new(None, 1).await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_run() {
        let db = Database::new(None, 1).await.unwrap();

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM combats")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM initiatives")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn test_schema_rejects_second_active_combat() {
        let db = Database::new(None, 1).await.unwrap();
        let insert = "INSERT INTO combats (name, is_active, created_at, updated_at) VALUES (?, 1, '', '')";

        sqlx::query(insert).bind("first").execute(db.pool()).await.unwrap();
        let second = sqlx::query(insert).bind("second").execute(db.pool()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_schema_rejects_unknown_phase() {
        let db = Database::new(None, 1).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO combats (name, phase, created_at, updated_at) VALUES ('x', 'paused', '', '')",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(None, 1).await.unwrap();
        db.run_migrations().await.unwrap();
    }
}
