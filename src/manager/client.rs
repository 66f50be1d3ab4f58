//! SSH client connection logic for the connectivity probe.
//!
//! ## Probe Lifecycle
//!
//! 1. **Client Configuration**: timeout, keepalive and compression settings.
//! 2. **Connection Establishment**: TCP + SSH handshake under the connect timeout.
//! 3. **Authentication**: every keyring key is offered through an [`AuthChain`].
//! 4. **Probe Command**: a unique token is echoed back to prove the session works.
//!
//! ## Retry Strategy
//!
//! Connection attempts use exponential backoff with jitter via `backon`,
//! starting at the configured retry delay and capped at [`MAX_RETRY_DELAY`].
//! Authentication failures and host key mismatches are never retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use russh::{ChannelMsg, client};
use tracing::{error, info, warn};

use crate::manager::auth::{AuthChain, AuthStrategy};
use crate::manager::config::{ConnectionConfig, MAX_RETRY_DELAY};
use crate::manager::error::is_retryable_error;
use crate::manager::session::SshClientHandler;

/// Output of the probe command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeOutput {
    pub stdout: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Build russh client configuration.
///
/// Inactivity timeout is the connect timeout; keepalive every 30 seconds
/// with at most 3 unanswered; zlib preferred when `compress` is set.
pub(crate) fn build_client_config(timeout: Duration, compress: bool) -> Arc<client::Config> {
    let compression = if compress {
        (&[russh::compression::ZLIB, russh::compression::NONE][..]).into()
    } else {
        (&[russh::compression::NONE][..]).into()
    };

    let preferred = russh::Preferred {
        compression,
        ..Default::default()
    };

    Arc::new(client::Config {
        inactivity_timeout: Some(timeout),
        keepalive_interval: Some(Duration::from_secs(30)),
        keepalive_max: 3,
        preferred,
        ..Default::default()
    })
}

/// Connect and authenticate, retrying transient failures.
///
/// Returns the session handle and the number of retries that were needed.
pub(crate) async fn connect_with_retry(
    conn: &ConnectionConfig,
    auth: &AuthChain,
) -> Result<(client::Handle<SshClientHandler>, u32), String> {
    let attempt_counter = AtomicU32::new(0);
    let address = conn.address();

    let backoff = ExponentialBuilder::default()
        .with_min_delay(conn.retry_delay())
        .with_max_delay(MAX_RETRY_DELAY)
        .with_max_times(conn.max_retries as usize)
        .with_jitter();

    let result = (|| async {
        let current_attempt = attempt_counter.fetch_add(1, Ordering::SeqCst);

        if current_attempt > 0 {
            warn!(
                "SSH probe retry attempt {} to {}@{}",
                current_attempt, conn.username, address
            );
        }

        connect(conn, auth).await
    })
    .retry(backoff)
    .when(|e| {
        let retryable = is_retryable_error(e);
        if !retryable {
            warn!(
                "SSH connection to {}@{} failed with non-retryable error: {}",
                conn.username, address, e
            );
        }
        retryable
    })
    .notify(|err, dur| {
        warn!("SSH connection failed: {}. Retrying in {:?}", err, dur);
    })
    .await;

    let total_attempts = attempt_counter.load(Ordering::SeqCst);
    let retry_count = total_attempts.saturating_sub(1);

    match result {
        Ok(handle) => {
            if retry_count > 0 {
                info!(
                    "SSH connection to {}@{} succeeded after {} retry attempt(s)",
                    conn.username, address, retry_count
                );
            }
            Ok((handle, retry_count))
        }
        Err(e) => {
            error!(
                "SSH connection to {}@{} failed after {} attempt(s). Last error: {}",
                conn.username, address, total_attempts, e
            );
            Err(format!(
                "SSH connection failed after {} attempt(s). Last error: {}",
                total_attempts, e
            ))
        }
    }
}

/// One connection attempt: handshake under timeout, then authentication.
async fn connect(
    conn: &ConnectionConfig,
    auth: &AuthChain,
) -> Result<client::Handle<SshClientHandler>, String> {
    let timeout = conn.connect_timeout();
    let config = build_client_config(timeout, conn.compression);
    let handler = SshClientHandler::new(conn.host_key_fingerprint.clone());

    let connect_future = client::connect(config, (conn.host.as_str(), conn.port), handler);

    let mut handle = tokio::time::timeout(timeout, connect_future)
        .await
        .map_err(|_| format!("Connection timed out after {:?}", timeout))?
        .map_err(|e| match e {
            russh::Error::UnknownKey => {
                "Host key mismatch: server key does not match host_key_fingerprint".to_string()
            }
            other => format!("Failed to connect: {}", other),
        })?;

    let success = auth.authenticate(&mut handle, &conn.username).await?;

    if !success {
        return Err("Authentication failed: no authentication methods succeeded".to_string());
    }

    Ok(handle)
}

/// Run `command` on the session and collect stdout.
///
/// On timeout the partial output is returned with `timed_out: true` and
/// `exit_code: -1`.
pub(crate) async fn execute_probe(
    handle: &client::Handle<SshClientHandler>,
    command: &str,
    timeout: Duration,
) -> Result<ProbeOutput, String> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| format!("Failed to open channel: {}", e))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| format!("Failed to execute command: {}", e))?;

    let mut stdout = Vec::with_capacity(256);
    let mut exit_code: Option<u32> = None;

    let result = tokio::time::timeout(timeout, async {
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = Some(exit_status);
                }
                Some(ChannelMsg::Eof) => {
                    if exit_code.is_some() {
                        break;
                    }
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }
        }
    })
    .await;

    let timed_out = result.is_err();
    if timed_out {
        warn!("Probe command timed out after {:?}", timeout);
    }

    let _ = channel.close().await;

    Ok(ProbeOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        exit_code: exit_code.map(|c| c as i32).unwrap_or(-1),
        timed_out,
    })
}

/// Shell command that echoes `token`.
pub(crate) fn probe_command(token: &str) -> String {
    format!("echo {}", token)
}

/// Check that a probe really ran: exit status 0 and the token echoed back.
pub(crate) fn verify_probe(output: &ProbeOutput, token: &str) -> Result<(), String> {
    if output.timed_out {
        return Err("probe command timed out".to_string());
    }
    if output.exit_code != 0 {
        return Err(format!(
            "probe command exited with status {}",
            output.exit_code
        ));
    }
    if !output.stdout.contains(token) {
        return Err("probe command returned unexpected output".to_string());
    }
    Ok(())
}
