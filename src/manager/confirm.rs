//! Confirmation sub-protocol for destructive commands.
//!
//! A [`PendingRemoval`] exists only between the prompt and the operator's
//! answer. The next line is always consumed as the answer, even when it
//! looks like a command.

use super::validate::KeyName;

/// Operator answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    /// `y` / `yes` in any case are affirmative; everything else is not.
    pub fn parse(line: &str) -> Self {
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
            Answer::Yes
        } else {
            Answer::No
        }
    }
}

/// A removal waiting for the operator's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    key: KeyName,
}

impl PendingRemoval {
    pub fn new(key: KeyName) -> Self {
        Self { key }
    }

    pub fn prompt(&self) -> String {
        format!("Are you sure you want to delete key '{}'? (y/N): ", self.key)
    }

    /// Resolve the pending removal: the key to remove, or `None` if cancelled.
    pub fn resolve(self, answer: Answer) -> Option<KeyName> {
        match answer {
            Answer::Yes => Some(self.key),
            Answer::No => None,
        }
    }
}
