//! Authentication chain for trying every key in turn.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::keys::PrivateKey;
use tracing::debug;

use crate::manager::session::SshClientHandler;
use crate::manager::validate::KeyName;

use super::KeyAuth;
use super::traits::AuthStrategy;

/// Authentication chain that tries multiple strategies in order.
///
/// The first successful authentication stops the chain.
pub struct AuthChain {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AuthChain {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Add public key authentication with one key.
    pub fn with_key(mut self, label: KeyName, key: Arc<PrivateKey>) -> Self {
        self.strategies.push(Box::new(KeyAuth::new(label, key)));
        self
    }

    /// Build a chain from every key in a keyring snapshot, ordered by name.
    pub fn from_keys(mut keys: Vec<(KeyName, Arc<PrivateKey>)>) -> Self {
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys.into_iter()
            .fold(Self::new(), |chain, (label, key)| chain.with_key(label, key))
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }
}

impl Default for AuthChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStrategy for AuthChain {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        if self.strategies.is_empty() {
            return Err("No authentication strategies configured".to_string());
        }

        let mut last_error = None;

        for strategy in &self.strategies {
            debug!("Trying authentication strategy: {}", strategy.name());

            match strategy.authenticate(handle, username).await {
                Ok(true) => {
                    debug!(
                        "Authentication succeeded with strategy: {}",
                        strategy.name()
                    );
                    return Ok(true);
                }
                Ok(false) => {
                    last_error = Some(format!("{} authentication rejected", strategy.name()));
                }
                Err(e) => {
                    debug!("Authentication error with strategy {}: {}", strategy.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "All authentication methods failed".to_string()))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}
