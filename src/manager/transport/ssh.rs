//! SSH transport backed by an on-disk keyring and a russh connectivity probe.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use russh::Disconnect;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::traits::Transport;
use crate::manager::auth::AuthChain;
use crate::manager::client::{connect_with_retry, execute_probe, probe_command, verify_probe};
use crate::manager::config::SshConfig;
use crate::manager::error::{ManagerError, Result};
use crate::manager::keyring::KeyRing;
use crate::manager::types::KeyDetails;
use crate::manager::validate::KeyName;

/// Transport that stores key pairs on disk and probes a remote SSH endpoint.
///
/// Nothing is acquired until [`Transport::start`]; [`Transport::stop`]
/// releases whatever is held and may be called at any point.
pub struct SshTransport {
    config: SshConfig,
    keyring: Option<KeyRing>,
    shutdown: Option<CancellationToken>,
    healthy: AtomicBool,
}

impl SshTransport {
    /// Build a transport from loaded configuration.
    ///
    /// Fails with [`ManagerError::Startup`] when the configuration is unusable.
    pub fn new(config: SshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            keyring: None,
            shutdown: None,
            healthy: AtomicBool::new(false),
        })
    }

    fn keyring(&self) -> Result<&KeyRing> {
        self.keyring
            .as_ref()
            .ok_or_else(|| ManagerError::Transport("transport not started".to_string()))
    }

    async fn probe(&self, auth: &AuthChain) -> std::result::Result<(), String> {
        let conn = &self.config.connection;
        let (handle, retries) = connect_with_retry(conn, auth).await?;

        let token = Uuid::new_v4().simple().to_string();
        let output = execute_probe(&handle, &probe_command(&token), conn.connect_timeout()).await;

        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "probe complete", "en")
            .await
        {
            warn!("Error during probe disconnect: {}", e);
        }

        verify_probe(&output?, &token)?;
        info!(
            "SSH probe to {} succeeded ({} retr{})",
            conn.address(),
            retries,
            if retries == 1 { "y" } else { "ies" }
        );
        Ok(())
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn start(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!("Starting SSH transport...");

        let keyring = KeyRing::open(&self.config.key_storage).await.map_err(|e| {
            error!("SSH transport failed to open key storage: {}", e);
            ManagerError::Startup(format!("failed to initialize key storage: {}", e))
        })?;

        info!(
            "SSH transport started with {} key(s) for {}@{}",
            keyring.len(),
            self.config.connection.username,
            self.config.connection.address()
        );
        self.keyring = Some(keyring);
        self.shutdown = Some(shutdown);
        self.healthy.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.shutdown.take() {
            token.cancel();
        }
        self.keyring = None;
        self.healthy.store(false, Ordering::SeqCst);
        info!("SSH transport stopped");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.keyring.is_some() && self.healthy.load(Ordering::SeqCst)
    }

    async fn generate_key_pair(&mut self, name: &KeyName) -> Result<()> {
        self.keyring()?.generate(name).await
    }

    async fn remove_key(&mut self, name: &KeyName) -> Result<()> {
        self.keyring()?.remove(name).await
    }

    async fn list_keys(&self) -> Result<Vec<KeyName>> {
        Ok(self.keyring()?.names())
    }

    async fn describe_key(&self, name: &KeyName) -> Result<KeyDetails> {
        self.keyring()?.details(name).await
    }

    async fn test_connection(&self) -> Result<()> {
        let keyring = self.keyring()?;
        let auth = AuthChain::from_keys(keyring.signing_keys());
        if auth.is_empty() {
            return Err(ManagerError::Connection(
                "no SSH keys available for authentication".to_string(),
            ));
        }

        let budget = self.config.connection.probe_budget();
        let cancelled = self.shutdown.clone().unwrap_or_else(CancellationToken::new);

        let outcome = tokio::select! {
            biased;

            _ = cancelled.cancelled() => Err("probe cancelled by shutdown".to_string()),
            result = tokio::time::timeout(budget, self.probe(&auth)) => match result {
                Ok(inner) => inner,
                Err(_) => Err(format!("probe timed out after {:?}", budget)),
            },
        };

        match outcome {
            Ok(()) => {
                self.healthy.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!("SSH connectivity probe failed: {}", e);
                self.healthy.store(false, Ordering::SeqCst);
                Err(ManagerError::Connection(e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "ssh"
    }
}
