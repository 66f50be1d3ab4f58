//! Authentication strategies for the connectivity probe.
//!
//! Every key in the keyring becomes a [`KeyAuth`] strategy; an [`AuthChain`]
//! tries them in name order until the server accepts one.
//!
//! # Example
//!
//! ```ignore
//! let chain = AuthChain::from_keys(keyring.signing_keys());
//! let ok = chain.authenticate(&mut handle, "relay").await?;
//! ```

mod chain;
mod key;
mod traits;

pub use chain::AuthChain;
pub use key::KeyAuth;
pub use traits::AuthStrategy;
