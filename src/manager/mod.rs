//! SSH key manager: an interactive console over a pluggable transport.
//!
//! This module is organized into the following submodules:
//!
//! - `validate`: Key name rules and the `KeyName` newtype
//! - `command`: Parsing one input line into a `Command`
//! - `confirm`: Yes/no answers for confirmation-gated removal
//! - `console`: The session loop and its phases
//! - `transport`: The `Transport` trait with SSH and in-memory implementations
//! - `keyring`: On-disk key pair storage used by the SSH transport
//! - `auth`: Public key authentication for the connectivity probe
//! - `client`: SSH connection with retry and probe execution
//! - `session`: russh client handler with host key checking
//! - `config`: JSON configuration with environment overrides
//! - `error`: Error taxonomy and retry classification
//! - `types`: Key details returned by transports
//! - `app`: Process wiring and exit codes

pub mod app;
pub(crate) mod auth;
pub(crate) mod client;
pub mod command;
pub mod config;
pub mod confirm;
pub mod console;
pub mod error;
pub(crate) mod keyring;
pub(crate) mod session;
pub mod transport;
pub mod types;
pub mod validate;

pub use console::Console;
pub use error::{ManagerError, Result};
pub use transport::{MemoryTransport, SshTransport, Transport};
pub use validate::{KeyName, is_valid_key_name};
