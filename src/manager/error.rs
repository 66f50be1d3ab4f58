//! Error taxonomy for the key manager and SSH retry classification.
//!
//! Every operation in the console surfaces a [`ManagerError`]. Only
//! [`ManagerError::Startup`] is fatal: it aborts the process before the
//! command prompt is ever shown. All other variants are rendered as a single
//! line and the session continues.
//!
//! The probe that backs the `test` command retries transient network
//! failures. [`is_retryable_error`] decides which russh error messages are
//! worth another attempt:
//!
//! 1. **Authentication failures (NOT retryable)**: rejected keys or denied
//!    access will not change by trying again.
//! 2. **Connection errors (retryable)**: refused connections, timeouts and
//!    unreachable networks are often transient.
//! 3. **Unknown errors**: retried unless they look like SSH protocol errors.
//!
//! Authentication patterns are checked first and win over connection patterns.

use thiserror::Error;

/// Errors produced by key name validation, transports and startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// Bad key name or missing argument. Always local to one command.
    #[error("{0}")]
    Validation(String),

    /// A key with this name already exists.
    #[error("key '{0}' already exists")]
    DuplicateKey(String),

    /// No key with this name is known to the transport.
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// The connectivity probe failed or timed out.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Generic I/O or cryptographic failure from the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration loading or transport start failed.
    #[error("startup failed: {0}")]
    Startup(String),

    /// The transport does not provide this operation.
    #[error("{0} is not implemented by this transport")]
    NotImplemented(&'static str),
}

impl ManagerError {
    /// Whether the error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ManagerError::Startup(_))
    }
}

/// Result alias used throughout the manager.
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Authentication error patterns that indicate permanent failures.
const AUTH_ERRORS: &[&str] = &[
    "authentication failed",
    "key authentication failed",
    "permission denied",
    "publickey",
    "auth fail",
    "no authentication",
    "all authentication methods failed",
    "authentication rejected",
    "host key mismatch",
];

/// Connection error patterns that indicate transient failures.
const RETRYABLE_ERRORS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "timeout",
    "network is unreachable",
    "no route to host",
    "host is down",
    "temporary failure",
    "resource temporarily unavailable",
    "handshake failed",
    "failed to connect",
    "broken pipe",
];

/// Determines if an SSH error message is retryable (transient) or permanent.
///
/// Authentication failures are checked first and are never retried, so a
/// message like "timeout during authentication failed" stays permanent.
/// Unknown messages are retried unless they mention "ssh" without also
/// mentioning a timeout or a connect failure.
pub(crate) fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if AUTH_ERRORS.iter().any(|p| error_lower.contains(p)) {
        return false;
    }

    if RETRYABLE_ERRORS.iter().any(|p| error_lower.contains(p)) {
        return true;
    }

    !error_lower.contains("ssh")
        || error_lower.contains("timeout")
        || error_lower.contains("connect")
}
