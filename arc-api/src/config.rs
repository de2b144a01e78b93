//! Configuration resolution for arc-api
//!
//! Multi-tier resolution for the Gemini API key with
//! Database → ENV → TOML priority. The database is authoritative so the
//! key set through the admin settings endpoint survives restarts.

use arc_common::config::TomlConfig;
use arc_common::db::settings;
use arc_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// A usable key is non-empty after trimming
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the Gemini API key from 3-tier configuration.
///
/// `None` means no tier has a usable key: automated moderation and AI
/// analysis stay disabled for this process.
pub async fn resolve_gemini_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = settings::get_setting(db, settings::GEMINI_API_KEY).await?;
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok();
    let toml_key = toml_config.gemini_api_key.clone();

    let mut sources = Vec::new();
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.as_deref().is_some_and(is_valid_key) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (key, source) in [
        (db_key, "database"),
        (env_key, "environment variable"),
        (toml_key, "TOML config"),
    ] {
        if let Some(key) = key {
            if is_valid_key(&key) {
                info!("Gemini API key loaded from {}", source);
                return Ok(Some(key.trim().to_string()));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_invalid() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
        assert!(!is_valid_key("\t\n"));
        assert!(is_valid_key("AIza-example"));
    }
}
