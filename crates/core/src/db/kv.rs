//! Key-value rows backing preferences and the cached session snapshot

use chrono::Utc;

use super::Db;
use crate::errors::Result;

/// Theme preference key
pub const THEME: &str = "theme";
/// Locale preference key
pub const LOCALE: &str = "locale";
/// Cached session snapshot key (full replica as JSON)
pub const SESSION_SNAPSHOT: &str = "prompt_master_session";

pub async fn get(db: &Db, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
        .bind(key)
        .fetch_optional(db.pool())
        .await?;

    Ok(value)
}

pub async fn set(db: &Db, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(db.pool())
    .await?;

    Ok(())
}

pub async fn remove(db: &Db, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM kv WHERE key = ?")
        .bind(key)
        .execute(db.pool())
        .await?;

    Ok(())
}
