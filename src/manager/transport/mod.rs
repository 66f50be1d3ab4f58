//! Transport implementations behind the console.
//!
//! - [`SshTransport`]: keys on disk, connectivity probed over russh
//! - [`MemoryTransport`]: keys in a map, scripted failures, call recording

mod memory;
mod ssh;
mod traits;

pub use memory::{CallLog, FailurePlan, MemoryKey, MemoryTransport};
pub use ssh::SshTransport;
pub use traits::Transport;
