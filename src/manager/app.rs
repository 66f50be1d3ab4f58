//! Process-level wiring: configuration, transport construction, console.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

use super::config::SshConfig;
use super::console::Console;
use super::error::Result;
use super::transport::SshTransport;

/// Load `config_path`, build the SSH transport and run one console session.
///
/// Configuration, construction and start failures are returned as
/// [`ManagerError::Startup`](super::error::ManagerError::Startup) before any
/// prompt is written.
pub async fn run<R, W>(config_path: &Path, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let config = SshConfig::load(config_path)?;
    info!(
        "Using {}@{} with keys in {}",
        config.connection.username,
        config.connection.address(),
        config.key_storage.key_dir.display()
    );

    let transport = SshTransport::new(config)?;
    Console::new(transport, input, output).run().await
}

/// Process exit status for a finished session.
pub fn exit_code(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
