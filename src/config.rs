//! Configuration management
//!
//! Settings come from the first TOML file found on the search path, overlaid
//! with `NETPANEL_*` environment variables (`NETPANEL_BACKEND__PORT=5001`).
//! Every section has defaults, so running without any file is fine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wizard::ValidationLevel;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Where the backend lives and how to talk to it
    #[serde(default)]
    pub backend: BackendConfig,

    /// Credential header and session persistence
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub wizard: WizardConfig,

    /// Raw configuration file editor
    #[serde(default)]
    pub editor: EditorConfig,

    /// Health monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Liveness endpoint, `/health` or `/ping` on older backends
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            health_path: default_health_path(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Header carrying the access key
    #[serde(default = "default_auth_header")]
    pub header: String,

    /// Refuse authenticated calls while no key is set.
    /// Older backends have no authentication at all.
    #[serde(default = "default_true")]
    pub required: bool,

    /// Persist the key between invocations
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Session file (default: per-user runtime directory)
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: default_auth_header(),
            required: true,
            persist: true,
            session_file: None,
        }
    }
}

impl AuthConfig {
    /// Where a persisted key lives. `None` when there is no explicit file and
    /// no per-login runtime directory: anywhere else would outlive the session.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_path_in(dirs::runtime_dir())
    }

    pub(crate) fn session_path_in(&self, runtime_dir: Option<PathBuf>) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| runtime_dir.map(|dir| dir.join("netpanel").join("session")))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WizardConfig {
    /// `strict` runs every rule, `basic` only checks required fields
    #[serde(default)]
    pub validation: ValidationLevel,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    /// `/config` or `/config/load`
    #[serde(default = "default_load_path")]
    pub load_path: String,

    /// Query parameter naming the file: `key`, `path` or `file`
    #[serde(default = "default_query_param")]
    pub query_param: String,

    #[serde(default = "default_save_path")]
    pub save_path: String,

    /// Body field naming the file on save: `path` or `file`
    #[serde(default = "default_body_field")]
    pub body_field: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            load_path: default_load_path(),
            query_param: default_query_param(),
            save_path: default_save_path(),
            body_field: default_body_field(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Health probe interval in seconds
    #[serde(default = "default_check_interval")]
    pub interval: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_check_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Oldest lines beyond this are dropped
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
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

// Default value functions
fn default_scheme() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_auth_header() -> String {
    "X-API-KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_load_path() -> String {
    "/config".to_string()
}

fn default_query_param() -> String {
    "key".to_string()
}

fn default_save_path() -> String {
    "/config/save".to_string()
}

fn default_body_field() -> String {
    "path".to_string()
}

fn default_check_interval() -> u64 {
    8
}

fn default_max_entries() -> usize {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration, preferring `explicit` over the search path
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => {
                anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
                Some(path.to_path_buf())
            }
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };

        let mut builder = config::Config::builder();
        match &file {
            Some(path) => {
                tracing::debug!("Loading config from: {}", path.display());
                builder = builder.add_source(config::File::from(path.as_path()));
            }
            None => tracing::debug!("No config file found, using defaults"),
        }

        builder
            .add_source(
                config::Environment::with_prefix("NETPANEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("netpanel.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("netpanel/config.toml"));
        }
        paths.push(PathBuf::from("/etc/netpanel/config.toml"));
        paths
    }
}
