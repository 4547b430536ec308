//! Configuration Module
//!
//! Handles loading server and client configuration from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where the server sends Drive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveBackend {
    /// Google Drive v3 REST API
    Google,
    /// In-process store, for local runs without Google credentials
    Memory,
}

impl FromStr for DriveBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(DriveBackend::Google),
            "memory" => Ok(DriveBackend::Memory),
            other => Err(format!("unknown drive backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Drive folder that uploads go to and listings read from
    pub folder_id: String,
    /// TTL in seconds for entries set without an explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for cached identity records
    pub user_info_ttl: u64,
    /// TTL in seconds for cached folder listings
    pub files_ttl: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
    /// Directory of static front-end assets, if served
    pub static_dir: Option<PathBuf>,
    pub drive_backend: DriveBackend,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FOLDER_ID` - Drive folder id (default: "root")
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `USER_INFO_TTL` - Identity TTL in seconds (default: 3600)
    /// - `FILES_TTL` - Listing TTL in seconds (default: 120)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 600)
    /// - `MAX_UPLOAD_BYTES` - Upload limit (default: 1 GiB)
    /// - `STATIC_DIR` - Static asset directory (default: unset)
    /// - `DRIVE_BACKEND` - `google` or `memory` (default: google)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            folder_id: env::var("FOLDER_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.folder_id),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            user_info_ttl: parse_var("USER_INFO_TTL").unwrap_or(defaults.user_info_ttl),
            files_ttl: parse_var("FILES_TTL").unwrap_or(defaults.files_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            static_dir: env::var("STATIC_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            drive_backend: parse_var("DRIVE_BACKEND").unwrap_or(defaults.drive_backend),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn user_info_ttl(&self) -> Duration {
        Duration::from_secs(self.user_info_ttl)
    }

    pub fn files_ttl(&self) -> Duration {
        Duration::from_secs(self.files_ttl)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            folder_id: "root".to_string(),
            default_ttl: 300,
            user_info_ttl: 3600,
            files_ttl: 120,
            cleanup_interval: 600,
            max_upload_bytes: 1024 * 1024 * 1024,
            static_dir: None,
            drive_backend: DriveBackend::Google,
        }
    }
}

/// Client-side cache and transport settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server API
    pub server_url: String,
    /// TTL in seconds for entries set without an explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for the cached auth status
    pub auth_status_ttl: u64,
    /// TTL in seconds for the cached file listing
    pub files_ttl: u64,
    /// Expired-entry sweep interval in seconds
    pub sweep_interval: u64,
}

impl ClientConfig {
    /// Loads `SERVER_URL`, `CLIENT_DEFAULT_TTL`, `CLIENT_AUTH_STATUS_TTL`,
    /// `CLIENT_FILES_TTL` and `CLIENT_SWEEP_INTERVAL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: env::var("SERVER_URL").unwrap_or(defaults.server_url),
            default_ttl: parse_var("CLIENT_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            auth_status_ttl: parse_var("CLIENT_AUTH_STATUS_TTL")
                .unwrap_or(defaults.auth_status_ttl),
            files_ttl: parse_var("CLIENT_FILES_TTL").unwrap_or(defaults.files_ttl),
            sweep_interval: parse_var("CLIENT_SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn auth_status_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_status_ttl)
    }

    pub fn files_ttl(&self) -> Duration {
        Duration::from_secs(self.files_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            default_ttl: 120,
            auth_status_ttl: 300,
            files_ttl: 60,
            sweep_interval: 30,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.folder_id, "root");
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.user_info_ttl(), Duration::from_secs(3600));
        assert_eq!(config.files_ttl(), Duration::from_secs(120));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(600));
        assert_eq!(config.drive_backend, DriveBackend::Google);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("FOLDER_ID");
        env::remove_var("FILES_TTL");
        env::remove_var("DRIVE_BACKEND");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.folder_id, "root");
        assert_eq!(config.files_ttl, 120);
        assert_eq!(config.drive_backend, DriveBackend::Google);
    }

    #[test]
    fn test_identity_outlives_listing() {
        let server = Config::default();
        assert!(server.user_info_ttl() > server.files_ttl());

        let client = ClientConfig::default();
        assert!(client.auth_status_ttl() > client.files_ttl());
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(120));
        assert_eq!(config.auth_status_ttl(), Duration::from_secs(300));
        assert_eq!(config.files_ttl(), Duration::from_secs(60));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_client_config_from_env() {
        env::set_var("SERVER_URL", "http://files.example.com");
        env::set_var("CLIENT_FILES_TTL", "45");

        let config = ClientConfig::from_env();
        assert_eq!(config.server_url, "http://files.example.com");
        assert_eq!(config.files_ttl(), Duration::from_secs(45));
        assert_eq!(config.auth_status_ttl, 300);

        env::remove_var("SERVER_URL");
        env::remove_var("CLIENT_FILES_TTL");
    }

    #[test]
    fn test_drive_backend_parse() {
        assert_eq!("Memory".parse::<DriveBackend>(), Ok(DriveBackend::Memory));
        assert_eq!(" google ".parse::<DriveBackend>(), Ok(DriveBackend::Google));
        assert!("s3".parse::<DriveBackend>().is_err());
    }
}
