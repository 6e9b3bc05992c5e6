use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::errors::Result;

pub mod kv;
pub mod schema;

/// Handle on the preference/mirror database
///
/// Owned by the `App`; clones share the underlying pool.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open the database at `path`, creating file and parent directory if missing
    pub async fn open(path: &str) -> Result<Db> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create database directory: {}", e))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal),
            )
            .await?;

        // Run schema migration
        // Split by semicolon to run multiple statements
        for statement in schema::SCHEMA.split(';') {
            if statement.trim().is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Db { pool })
    }

    /// The underlying connection pool
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, checkpointing WAL state
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
