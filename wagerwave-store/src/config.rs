//! Configuration for the session store.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::ledger::DEFAULT_TOP_UP_AMOUNTS;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub prefill: PrefillConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (comma-separated, `*` for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite database path, used by the `sqlite` backend.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// External identity authority (PostgREST RPC endpoint).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    #[serde(default = "default_authority_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_authority_timeout")]
    pub timeout_secs: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: default_authority_url(),
            api_key: String::new(),
            timeout_secs: default_authority_timeout(),
        }
    }
}

impl AuthorityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Accounts given the admin role when they sign in.
    #[serde(default)]
    pub admin_usernames: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_session_interval")]
    pub session_interval_ms: u64,
    #[serde(default = "default_users_interval")]
    pub users_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            session_interval_ms: default_session_interval(),
            users_interval_ms: default_users_interval(),
        }
    }
}

impl SyncConfig {
    pub fn session_interval(&self) -> Duration {
        Duration::from_millis(self.session_interval_ms)
    }

    pub fn users_interval(&self) -> Duration {
        Duration::from_millis(self.users_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_top_up_amounts")]
    pub top_up_amounts: Vec<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            top_up_amounts: default_top_up_amounts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrefillConfig {
    #[serde(default = "default_scrub_delay")]
    pub scrub_delay_ms: u64,
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self {
            scrub_delay_ms: default_scrub_delay(),
        }
    }
}

impl PrefillConfig {
    pub fn scrub_delay(&self) -> Duration {
        Duration::from_millis(self.scrub_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8787
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_storage_path() -> String {
    "./data/wagerwave.db".to_string()
}
fn default_authority_url() -> String {
    "http://localhost:54321".to_string()
}
fn default_authority_timeout() -> u64 {
    10
}
fn default_session_interval() -> u64 {
    1000
}
fn default_users_interval() -> u64 {
    2000
}
fn default_top_up_amounts() -> Vec<u64> {
    DEFAULT_TOP_UP_AMOUNTS.to_vec()
}
fn default_scrub_delay() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (WAGERWAVE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`Config::load`] with an explicit config file name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name(file).required(false))
            // Override with environment variables (WAGERWAVE__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("WAGERWAVE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ledger.top_up_amounts")
                    .with_list_parse_key("auth.admin_usernames")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
