//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and brings the schema up
//! to date with idempotent `CREATE TABLE IF NOT EXISTS` statements.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Well-known guid of the seeded administrator account.
///
/// Created on first run so a fresh deployment has someone who can work the
/// moderation queue before any real users exist.
pub const SEED_ADMIN_GUID: &str = "00000000-0000-0000-0000-000000000001";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
///
/// Also used by tests against in-memory pools.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_settings_table(pool).await?;
    create_artifacts_table(pool).await?;
    create_artifact_likes_table(pool).await?;
    create_artifact_comments_table(pool).await?;
    create_collections_table(pool).await?;
    create_collection_artifacts_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            is_admin INTEGER NOT NULL DEFAULT 0,
            avatar TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Seed an administrator if one doesn't exist
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (guid, name, email, is_admin, created_at, updated_at)
        VALUES (?, 'Admin', 'admin@culturearc.local', 1, ?, ?)
        "#,
    )
    .bind(SEED_ADMIN_GUID)
    .bind(chrono::Utc::now())
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs (e.g. the Gemini API
/// key configured at runtime).
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_artifacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            image_url TEXT NOT NULL,
            category TEXT NOT NULL,
            era TEXT NOT NULL,
            region TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            ai_is_appropriate INTEGER,
            ai_confidence REAL,
            ai_reason TEXT,
            ai_reviewed_at TIMESTAMP,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_artifacts_status ON artifacts(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_artifacts_user ON artifacts(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_artifact_likes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifact_likes (
            artifact_id TEXT NOT NULL REFERENCES artifacts(guid) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL,
            PRIMARY KEY (artifact_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_artifact_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifact_comments (
            guid TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(guid) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            user_name TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comments_artifact ON artifact_comments(artifact_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            image_url TEXT NOT NULL,
            is_private INTEGER NOT NULL DEFAULT 0,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collection_artifacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_artifacts (
            collection_id TEXT NOT NULL REFERENCES collections(guid) ON DELETE CASCADE,
            artifact_id TEXT NOT NULL REFERENCES artifacts(guid) ON DELETE CASCADE,
            added_at TIMESTAMP NOT NULL,
            PRIMARY KEY (collection_id, artifact_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
