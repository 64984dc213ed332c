//! Configuration management for gmassist

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "GMASSIST_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Gmail REST API settings
    #[serde(default)]
    pub gmail: GmailConfig,

    /// OAuth flow settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Generative language API settings
    #[serde(default)]
    pub generative: GenerativeConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log file path
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Account record store; relative paths resolve against `data_dir`
    #[serde(default = "default_accounts_file")]
    pub accounts_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
            data_dir: default_data_dir(),
            accounts_file: default_accounts_file(),
        }
    }
}

/// Gmail REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Base URL of the Gmail API (overridable for tests and proxies)
    #[serde(default = "default_gmail_api_base")]
    pub api_base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Global rate limit (requests per second)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,

    /// Number of messages shown by `list emails`
    #[serde(default = "default_list_count")]
    pub list_default_count: u32,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gmail_api_base(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_per_second: default_rate_limit(),
            list_default_count: default_list_count(),
        }
    }
}

/// OAuth flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Scopes requested during interactive authorization
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// How long to wait for the browser callback (seconds)
    #[serde(default = "default_authorization_timeout")]
    pub authorization_timeout_secs: u64,

    /// Path the loopback listener expects the redirect on
    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    /// Launch the system browser; when false the consent URL is printed
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            authorization_timeout_secs: default_authorization_timeout(),
            callback_path: default_callback_path(),
            open_browser: true,
        }
    }
}

/// Generative language API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_generative_api_base")]
    pub api_base_url: String,

    /// Model used for summaries and suggested replies
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_generative_api_base(),
            model: default_model(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    get_data_dir().join("logs").join("gmassist.log")
}

fn default_data_dir() -> PathBuf {
    get_data_dir()
}

fn default_accounts_file() -> PathBuf {
    PathBuf::from("gmail_accounts.json")
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_rate_limit() -> u32 {
    10
}

fn default_list_count() -> u32 {
    5
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/gmail.modify".to_string()]
}

fn default_authorization_timeout() -> u64 {
    300
}

fn default_callback_path() -> String {
    "/".to_string()
}

fn default_generative_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_true() -> bool {
    true
}

/// Get the data directory (XDG: ~/.local/share/gmassist)
fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join(crate::APP_NAME)
}

/// Get the config directory (XDG: ~/.config/gmassist)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(crate::APP_NAME)
}

impl Config {
    /// Default config file path, honoring `GMASSIST_CONFIG`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| get_config_dir().join("config.toml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            info!("No config file found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the account record store path
    pub fn accounts_path(&self) -> PathBuf {
        if self.general.accounts_file.is_absolute() {
            self.general.accounts_file.clone()
        } else {
            self.general.data_dir.join(&self.general.accounts_file)
        }
    }

    /// Get the local token file directory
    pub fn tokens_dir(&self) -> PathBuf {
        get_config_dir().join("tokens")
    }

    /// Get the log directory
    pub fn logs_dir(&self) -> PathBuf {
        self.general
            .log_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.general.data_dir.join("logs"))
    }
}
