//! Key name validation.
//!
//! Key names end up as file stems in the key directory and as SSH key
//! comments, so they are restricted to ASCII letters, digits, `-` and `_`
//! and at most [`MAX_KEY_NAME_LEN`] characters. A single bad character
//! rejects the whole name.

use std::fmt;

use super::error::{ManagerError, Result};

/// Maximum number of characters in a key name.
pub const MAX_KEY_NAME_LEN: usize = 50;

/// Returns true when `name` is a usable key name.
pub fn is_valid_key_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_KEY_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// A validated key name.
///
/// Only obtainable through [`KeyName::parse`], so holding one proves the
/// name is safe to use as a path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyName(String);

impl KeyName {
    pub fn parse(name: &str) -> Result<Self> {
        if is_valid_key_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(ManagerError::Validation(format!(
                "Invalid key name '{}'. Use only alphanumeric characters, hyphens and underscores (max {} characters).",
                name, MAX_KEY_NAME_LEN
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
