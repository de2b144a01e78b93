//! Key-value settings stored in the database

use crate::Result;
use sqlx::SqlitePool;

/// Settings key holding the Gemini API key configured at runtime
pub const GEMINI_API_KEY: &str = "gemini_api_key";

/// Read a setting value, `None` if the key has never been set
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(value,)| value))
}

/// Write a setting value (insert or overwrite)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
