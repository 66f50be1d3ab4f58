//! Configuration loading for the key manager.
//!
//! Settings come from a JSON file and are then overridden by environment
//! variables. The file path itself is resolved with the priority:
//!
//! 1. **Parameter** - first positional argument of the binary
//! 2. **Environment Variable** - `SSH_KEY_MANAGER_CONFIG`
//! 3. **Default** - `config.json`
//!
//! # Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SSH_HOST` | `connection.host` |
//! | `SSH_PORT` | `connection.port` |
//! | `SSH_USERNAME` | `connection.username` |
//! | `SSH_CONNECT_TIMEOUT` | `connection.timeout_secs` |
//! | `SSH_MAX_RETRIES` | `connection.max_retries` |
//! | `SSH_RETRY_DELAY_MS` | `connection.retry_delay_ms` |
//! | `SSH_COMPRESSION` | `connection.compression` |
//! | `SSH_KEY_DIR` | `key_storage.key_dir` |
//!
//! Values that fail to parse are ignored and the file (or default) value is kept.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ManagerError, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default SSH connection timeout in seconds
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default maximum retry attempts for the connectivity probe
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry delay in milliseconds
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Maximum retry delay cap
pub(crate) const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Longest accepted connect timeout (one hour).
pub(crate) const MAX_CONNECT_TIMEOUT_SECS: u64 = 3600;

pub(crate) const CONFIG_PATH_ENV_VAR: &str = "SSH_KEY_MANAGER_CONFIG";
pub(crate) const HOST_ENV_VAR: &str = "SSH_HOST";
pub(crate) const PORT_ENV_VAR: &str = "SSH_PORT";
pub(crate) const USERNAME_ENV_VAR: &str = "SSH_USERNAME";
pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "SSH_CONNECT_TIMEOUT";
pub(crate) const MAX_RETRIES_ENV_VAR: &str = "SSH_MAX_RETRIES";
pub(crate) const RETRY_DELAY_MS_ENV_VAR: &str = "SSH_RETRY_DELAY_MS";
pub(crate) const COMPRESSION_ENV_VAR: &str = "SSH_COMPRESSION";
pub(crate) const KEY_DIR_ENV_VAR: &str = "SSH_KEY_DIR";

/// Key algorithm used for newly generated key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Ed25519,
    Rsa,
}

/// Remote endpoint used by the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub compression: bool,
    /// Expected server host key fingerprint (`SHA256:...`). Any key is accepted when unset.
    pub host_key_fingerprint: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
            username: "relay".to_string(),
            timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            compression: true,
            host_key_fingerprint: None,
        }
    }
}

impl ConnectionConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Upper bound for a whole connectivity probe: every connection attempt,
    /// the backoff between them, and the probe command itself.
    pub fn probe_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let per_attempt = self.connect_timeout().saturating_add(MAX_RETRY_DELAY);
        per_attempt
            .saturating_mul(attempts)
            .saturating_add(self.connect_timeout())
    }
}

/// Where and how key material is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStorageConfig {
    pub key_dir: PathBuf,
    pub private_key_ext: String,
    pub public_key_ext: String,
    pub algorithm: KeyAlgorithm,
    /// Generated keys get the comment `<name>@<comment_domain>`.
    pub comment_domain: String,
}

impl Default for KeyStorageConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("./ssh_keys"),
            private_key_ext: ".pem".to_string(),
            public_key_ext: ".pub".to_string(),
            algorithm: KeyAlgorithm::Ed25519,
            comment_domain: "ssh-key-manager".to_string(),
        }
    }
}

/// Full key manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub connection: ConnectionConfig,
    pub key_storage: KeyStorageConfig,
}

impl SshConfig {
    /// Load the configuration file, apply environment overrides and validate.
    ///
    /// Any failure is a [`ManagerError::Startup`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ManagerError::Startup(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_json(&raw).map_err(|e| {
            ManagerError::Startup(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.apply_env_overrides();
        config.validate()?;
        debug!(
            "Loaded configuration from {} (key_dir={})",
            path.display(),
            config.key_storage.key_dir.display()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Overlay environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        let conn = &mut self.connection;
        if let Some(host) = env_override::<String>(HOST_ENV_VAR) {
            conn.host = host;
        }
        if let Some(port) = env_override(PORT_ENV_VAR) {
            conn.port = port;
        }
        if let Some(username) = env_override::<String>(USERNAME_ENV_VAR) {
            conn.username = username;
        }
        if let Some(timeout) = env_override(CONNECT_TIMEOUT_ENV_VAR) {
            conn.timeout_secs = timeout;
        }
        if let Some(retries) = env_override(MAX_RETRIES_ENV_VAR) {
            conn.max_retries = retries;
        }
        if let Some(delay) = env_override(RETRY_DELAY_MS_ENV_VAR) {
            conn.retry_delay_ms = delay;
        }
        if let Ok(compress) = env::var(COMPRESSION_ENV_VAR) {
            conn.compression = compress.eq_ignore_ascii_case("true") || compress == "1";
        }
        if let Some(key_dir) = env_override::<PathBuf>(KEY_DIR_ENV_VAR) {
            self.key_storage.key_dir = key_dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ManagerError::Startup(format!("invalid configuration: {}", msg)));

        if self.connection.host.trim().is_empty() {
            return invalid("connection.host must not be empty");
        }
        if self.connection.username.trim().is_empty() {
            return invalid("connection.username must not be empty");
        }
        if self.connection.port == 0 {
            return invalid("connection.port must not be 0");
        }
        if self.connection.timeout_secs == 0 {
            return invalid("connection.timeout_secs must be positive");
        }
        if self.connection.timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            return invalid(&format!(
                "connection.timeout_secs must be at most {}",
                MAX_CONNECT_TIMEOUT_SECS
            ));
        }
        if self.key_storage.key_dir.as_os_str().is_empty() {
            return invalid("key_storage.key_dir must not be empty");
        }
        if self.key_storage.private_key_ext.is_empty() {
            return invalid("key_storage.private_key_ext must not be empty");
        }
        if self.key_storage.private_key_ext == self.key_storage.public_key_ext {
            return invalid("private and public key extensions must differ");
        }
        Ok(())
    }
}

/// Resolve the config file path with priority: parameter -> env var -> default
pub fn resolve_config_path(path_param: Option<String>) -> PathBuf {
    if let Some(path) = path_param {
        return PathBuf::from(path);
    }

    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn env_override<T: FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|value| value.parse::<T>().ok())
}
