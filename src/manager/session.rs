//! russh client handler for the connectivity probe.
//!
//! When a host key fingerprint is configured, the server must present a key
//! with exactly that SHA256 fingerprint. Without one every host key is
//! accepted (like `StrictHostKeyChecking=no`) and a warning is logged.

use russh::client;
use russh::keys::{self, HashAlg};
use tracing::warn;

pub struct SshClientHandler {
    expected_fingerprint: Option<String>,
}

impl SshClientHandler {
    pub fn new(expected_fingerprint: Option<String>) -> Self {
        Self {
            expected_fingerprint,
        }
    }

    /// Decide whether a server key with `fingerprint` is acceptable.
    pub(crate) fn accepts(&self, fingerprint: &str) -> bool {
        match &self.expected_fingerprint {
            Some(expected) => expected.trim() == fingerprint,
            None => true,
        }
    }
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        if self.expected_fingerprint.is_none() {
            warn!(
                "No host key fingerprint configured; accepting server key {}",
                fingerprint
            );
        } else if !self.accepts(&fingerprint) {
            warn!("Host key mismatch: server presented {}", fingerprint);
        }
        Ok(self.accepts(&fingerprint))
    }
}
