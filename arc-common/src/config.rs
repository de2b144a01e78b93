//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "CULTUREARC_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "culturearc.db";

/// Optional TOML configuration file
///
/// All fields are optional; anything absent falls back to a compiled
/// default or an environment variable (see the resolution order of each
/// consumer).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root data folder (lowest-priority source for it)
    pub root_folder: Option<String>,
    /// HTTP listen port (default 5710)
    pub port: Option<u16>,
    /// Gemini API key (lowest-priority source for it)
    pub gemini_api_key: Option<String>,
    /// Gemini model used for content review
    pub gemini_model: Option<String>,
    /// Confidence threshold for auto-deciding moderation status
    pub approve_threshold: Option<f64>,
    /// Timeout for the outbound review call, in seconds
    pub review_timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Load the config file from the default locations.
    ///
    /// Missing file is not an error: every field has a fallback, so an
    /// absent config simply yields the defaults.
    pub fn load() -> Result<Self> {
        let path = match find_config_file() {
            Some(path) => path,
            None => {
                debug!("No config.toml found, using defaults");
                return Ok(TomlConfig::default());
            }
        };

        Self::load_from(&path)
    }

    /// Load the config file from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Locate the configuration file for the platform.
///
/// Checks the user config directory first, then (on Linux) the system-wide
/// location.
fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("culturearc").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/culturearc/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// Ensure the root folder exists and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root_folder)?;
    Ok(root_folder.join(DATABASE_FILE))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("culturearc"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/culturearc"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("culturearc"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/culturearc"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("culturearc"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\culturearc"))
    } else {
        PathBuf::from("./culturearc_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some("/from/cli"), &toml);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_no_cli_or_env() {
        // Note: assumes CULTUREARC_ROOT is not set in the test environment.
        if std::env::var(ROOT_FOLDER_ENV).is_ok() {
            return;
        }
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(None, &toml);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn parses_full_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            root_folder = "/srv/culturearc"
            port = 5710
            gemini_api_key = "test-key"
            gemini_model = "gemini-1.5-flash"
            approve_threshold = 0.8
            review_timeout_secs = 20
            "#,
        )
        .unwrap();

        let config = TomlConfig::load_from(&path).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/culturearc"));
        assert_eq!(config.port, Some(5710));
        assert_eq!(config.gemini_api_key.as_deref(), Some("test-key"));
        assert_eq!(config.approve_threshold, Some(0.8));
        assert_eq!(config.review_timeout_secs, Some(20));
    }

    #[test]
    fn rejects_malformed_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number").unwrap();

        assert!(TomlConfig::load_from(&path).is_err());
    }
}
