//! Gateway settings and configuration management.
//!
//! This module provides configuration for the orbita-gateway binary,
//! supporting multiple configuration sources with proper precedence.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The GoLogin API token is not configured.
    #[error("GOLOGIN_API_TOKEN is not set; the fingerprint service requires a bearer token")]
    MissingToken,

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Main gateway settings.
///
/// Settings can be loaded from files, environment variables, or CLI arguments.
///
/// # Configuration Precedence
///
/// Settings are applied in the following order (later sources override earlier):
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
/// 4. CLI arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// GoLogin API bearer token. Required; startup fails without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Base URL of the GoLogin fingerprint API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Workspace name sent as `currentWorkspace` on fingerprint requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// OS family requested from the fingerprint API ("lin", "mac", "win").
    #[serde(default = "default_os_type")]
    pub os_type: String,

    /// OS variant hint (e.g. "M1" for Apple Silicon).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_spec: Option<String>,

    /// Path to the Orbita browser executable.
    #[serde(default = "default_orbita_path")]
    pub orbita_path: PathBuf,

    /// Port the gateway listens on.
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Executable that runs the automation backend.
    #[serde(default = "default_backend_command")]
    pub backend_command: PathBuf,

    /// Host the automation backend listens on.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// Port the automation backend listens on.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    /// Maximum concurrent automation sessions the backend may run.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u32,

    /// Depth of the backend's pending-session queue.
    #[serde(default = "default_queue_length")]
    pub queue_length: u32,

    /// Backend per-connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Whether the backend tolerates upstream TLS errors.
    #[serde(default = "default_ignore_https_errors")]
    pub ignore_https_errors: bool,

    /// Whether the backend should exit when its own health check fails.
    #[serde(default)]
    pub exit_on_health_failure: bool,

    /// Root directory for per-session profile directories.
    #[serde(default = "default_profile_root")]
    pub profile_root: PathBuf,

    /// Age in seconds after which an untouched profile directory is swept.
    #[serde(default = "default_profile_max_age_secs")]
    pub profile_max_age_secs: u64,

    /// Retries after the first failed fingerprint fetch.
    #[serde(default = "default_fingerprint_retries")]
    pub fingerprint_retries: u32,

    /// Delay before restarting a crashed backend, in seconds.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

// Default value functions for serde
fn default_api_url() -> String {
    "https://api.gologin.com".to_string()
}

fn default_os_type() -> String {
    "lin".to_string()
}

fn default_orbita_path() -> PathBuf {
    PathBuf::from("/usr/bin/orbita-browser")
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_backend_command() -> PathBuf {
    PathBuf::from("browserless")
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

fn default_backend_port() -> u16 {
    3000
}

fn default_max_concurrent_sessions() -> u32 {
    1
}

fn default_queue_length() -> u32 {
    5
}

fn default_connection_timeout_ms() -> u64 {
    60_000
}

fn default_ignore_https_errors() -> bool {
    true
}

fn default_profile_root() -> PathBuf {
    env::temp_dir().join("orbita-gateway").join("profiles")
}

fn default_profile_max_age_secs() -> u64 {
    7200
}

fn default_fingerprint_retries() -> u32 {
    2
}

fn default_restart_delay_secs() -> u64 {
    5
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: default_api_url(),
            workspace: None,
            os_type: default_os_type(),
            os_spec: None,
            orbita_path: default_orbita_path(),
            gateway_port: default_gateway_port(),
            backend_command: default_backend_command(),
            backend_host: default_backend_host(),
            backend_port: default_backend_port(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
            queue_length: default_queue_length(),
            connection_timeout_ms: default_connection_timeout_ms(),
            ignore_https_errors: default_ignore_https_errors(),
            exit_on_health_failure: false,
            profile_root: default_profile_root(),
            profile_max_age_secs: default_profile_max_age_secs(),
            fingerprint_retries: default_fingerprint_retries(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

impl GatewaySettings {
    /// Creates a new GatewaySettings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a configuration file.
    ///
    /// Supports both TOML and JSON formats, detected by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Ok(toml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Loads settings from environment variables alone.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// Applies environment variable overrides to current settings.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("GOLOGIN_API_TOKEN") {
            if !val.is_empty() {
                self.api_token = Some(val);
            }
        }

        if let Ok(val) = env::var("GOLOGIN_API_URL") {
            self.api_url = val;
        }

        if let Ok(val) = env::var("GOLOGIN_WORKSPACE") {
            self.workspace = Some(val);
        }

        if let Ok(val) = env::var("GOLOGIN_OS") {
            self.os_type = val;
        }

        if let Ok(val) = env::var("GOLOGIN_OS_SPEC") {
            self.os_spec = Some(val);
        }

        if let Ok(val) = env::var("ORBITA_PATH") {
            self.orbita_path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("GATEWAY_PORT") {
            if let Ok(port) = val.parse() {
                self.gateway_port = port;
            }
        }

        if let Ok(val) = env::var("BACKEND_COMMAND") {
            self.backend_command = PathBuf::from(val);
        }

        if let Ok(val) = env::var("BACKEND_HOST") {
            self.backend_host = val;
        }

        if let Ok(val) = env::var("BACKEND_PORT") {
            if let Ok(port) = val.parse() {
                self.backend_port = port;
            }
        }

        if let Ok(val) = env::var("MAX_CONCURRENT_SESSIONS") {
            if let Ok(n) = val.parse() {
                self.max_concurrent_sessions = n;
            }
        }

        if let Ok(val) = env::var("QUEUE_LENGTH") {
            if let Ok(n) = val.parse() {
                self.queue_length = n;
            }
        }

        if let Ok(val) = env::var("CONNECTION_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.connection_timeout_ms = ms;
            }
        }

        if let Ok(val) = env::var("IGNORE_HTTPS_ERRORS") {
            self.ignore_https_errors = parse_bool(&val);
        }

        if let Ok(val) = env::var("EXIT_ON_HEALTH_FAILURE") {
            self.exit_on_health_failure = parse_bool(&val);
        }

        if let Ok(val) = env::var("PROFILE_ROOT") {
            self.profile_root = PathBuf::from(val);
        }

        if let Ok(val) = env::var("PROFILE_MAX_AGE_SECS") {
            if let Ok(secs) = val.parse() {
                self.profile_max_age_secs = secs;
            }
        }

        if let Ok(val) = env::var("FINGERPRINT_RETRIES") {
            if let Ok(n) = val.parse() {
                self.fingerprint_retries = n;
            }
        }
    }

    /// Validates the settings.
    ///
    /// The API token is the only hard requirement: without it every
    /// fingerprint request would be rejected upstream, so startup fails
    /// immediately instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.api_token {
            Some(token) if !token.is_empty() => {}
            _ => return Err(ConfigError::MissingToken),
        }

        if self.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.gateway_port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway_port cannot be 0".to_string(),
            ));
        }

        if self.gateway_port == self.backend_port && self.backend_host == "127.0.0.1" {
            return Err(ConfigError::ValidationError(format!(
                "gateway_port and backend_port are both {}; the proxy would loop onto itself",
                self.gateway_port
            )));
        }

        Ok(())
    }

    /// Returns whether a GoLogin token is configured. Used by the health
    /// endpoint; does not imply the token is valid upstream.
    pub fn token_configured(&self) -> bool {
        matches!(&self.api_token, Some(t) if !t.is_empty())
    }

    /// Base URL of the automation backend this gateway proxies to.
    pub fn backend_http_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }

    /// WebSocket URL of the automation backend.
    pub fn backend_ws_url(&self) -> String {
        format!("ws://{}:{}", self.backend_host, self.backend_port)
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Command-line argument overrides, applied last in the precedence chain.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to a configuration file.
    pub config_file: Option<PathBuf>,
    /// Gateway listen port.
    pub gateway_port: Option<u16>,
    /// Orbita executable path.
    pub orbita_path: Option<PathBuf>,
    /// GoLogin API token.
    pub api_token: Option<String>,
    /// GoLogin API base URL.
    pub api_url: Option<String>,
    /// Workspace name.
    pub workspace: Option<String>,
    /// Requested OS family.
    pub os_type: Option<String>,
    /// Requested OS variant.
    pub os_spec: Option<String>,
    /// Profile root directory.
    pub profile_root: Option<PathBuf>,
}

impl CliArgs {
    /// Resolves the full settings chain: defaults, then the config file (if
    /// given), then environment variables, then these CLI overrides.
    pub fn load_settings(&self) -> Result<GatewaySettings, ConfigError> {
        let mut settings = match &self.config_file {
            Some(path) => GatewaySettings::from_file(path)?,
            None => GatewaySettings::default(),
        };

        settings.apply_env_overrides();
        self.apply_to(&mut settings);

        Ok(settings)
    }

    /// Applies the CLI overrides onto existing settings.
    fn apply_to(&self, settings: &mut GatewaySettings) {
        if let Some(port) = self.gateway_port {
            settings.gateway_port = port;
        }
        if let Some(ref path) = self.orbita_path {
            settings.orbita_path = path.clone();
        }
        if let Some(ref token) = self.api_token {
            settings.api_token = Some(token.clone());
        }
        if let Some(ref url) = self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(ref workspace) = self.workspace {
            settings.workspace = Some(workspace.clone());
        }
        if let Some(ref os) = self.os_type {
            settings.os_type = os.clone();
        }
        if let Some(ref spec) = self.os_spec {
            settings.os_spec = Some(spec.clone());
        }
        if let Some(ref root) = self.profile_root {
            settings.profile_root = root.clone();
        }
    }
}
