//! Public key authentication with a key held by the keyring.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::keys::{self, PrivateKey};
use tracing::debug;

use crate::manager::session::SshClientHandler;
use crate::manager::validate::KeyName;

use super::traits::AuthStrategy;

/// Authenticates with one already-loaded private key.
pub struct KeyAuth {
    label: KeyName,
    key: Arc<PrivateKey>,
}

impl KeyAuth {
    pub fn new(label: KeyName, key: Arc<PrivateKey>) -> Self {
        Self { label, key }
    }

    pub fn label(&self) -> &KeyName {
        &self.label
    }
}

#[async_trait]
impl AuthStrategy for KeyAuth {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String> {
        // For RSA keys, use the best supported hash algorithm
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();
        debug!(
            "Trying key {} with RSA hash algorithm {:?}",
            self.label, hash_alg
        );

        let key_with_hash = keys::PrivateKeyWithHashAlg::new(Arc::clone(&self.key), hash_alg);

        let result = handle
            .authenticate_publickey(username, key_with_hash)
            .await
            .map_err(|e| format!("Key authentication failed for {}: {}", self.label, e))?;

        Ok(result.success())
    }

    fn name(&self) -> &'static str {
        "key"
    }
}
