//! Host configuration
//!
//! Loaded from `config.toml` in the platform config directory; every
//! field has a default so a missing file just means defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use anju_core::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port the selection host listens on
    pub port: u16,
    /// Database file override; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Operator session lifetime in hours
    pub session_hours: i64,
    /// Bootstrap operator account created on first run
    pub admin_username: String,
    pub admin_display_name: String,
    /// Seed the demo dataset when the candidate table is empty
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: anju_net::DEFAULT_PORT,
            database_path: None,
            session_hours: anju_core::auth::SESSION_HOURS,
            admin_username: "admin".into(),
            admin_display_name: "管理员".into(),
            seed_demo_data: true,
        }
    }
}

impl AppConfig {
    /// Load from the given file, falling back to defaults if absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)
            .map_err(|e| anju_core::Error::Validation(format!("bad config: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.port, anju_net::DEFAULT_PORT);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 9000\nseed_demo_data = false\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.seed_demo_data);
        assert_eq!(config.admin_username, "admin");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
