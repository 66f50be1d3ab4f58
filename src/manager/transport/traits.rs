//! Transport capability trait.
//!
//! A transport owns key material and the network path the keys
//! authenticate. The console only ever talks to it through this trait and
//! holds the single instance for the whole session.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::manager::error::Result;
use crate::manager::types::KeyDetails;
use crate::manager::validate::KeyName;

/// Key lifecycle, health and connectivity operations of a transport.
///
/// Implementations must be `Send + Sync` so a console can run on any tokio runtime.
/// Internal synchronization of key storage is the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Acquire runtime resources (key storage, network configuration).
    ///
    /// Called once per session. `shutdown` is cancelled when the session
    /// ends so long-running operations can bail out.
    async fn start(&mut self, shutdown: CancellationToken) -> Result<()>;

    /// Release whatever `start` acquired.
    ///
    /// Must not fail when `start` never ran or only partially succeeded.
    async fn stop(&mut self) -> Result<()>;

    /// Cheap, non-blocking liveness check.
    fn is_healthy(&self) -> bool;

    /// Create a new key pair. Fails with `DuplicateKey` if the name is taken.
    async fn generate_key_pair(&mut self, name: &KeyName) -> Result<()>;

    /// Delete a key pair. Fails with `KeyNotFound` if absent.
    async fn remove_key(&mut self, name: &KeyName) -> Result<()>;

    /// All known key names, in no particular order.
    async fn list_keys(&self) -> Result<Vec<KeyName>>;

    /// Descriptive information about one key. Fails with `KeyNotFound` if absent.
    async fn describe_key(&self, name: &KeyName) -> Result<KeyDetails>;

    /// Live connectivity probe using the current key set.
    ///
    /// Implementations enforce their own bounded timeout and report failures
    /// as `Connection` errors.
    async fn test_connection(&self) -> Result<()>;

    /// Short transport name for logging.
    fn name(&self) -> &'static str;
}
