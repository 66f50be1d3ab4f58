//! In-memory transport.
//!
//! Holds keys in a map and never touches the filesystem or network. Every
//! operation can be made to fail, and calls are recorded, so the console can
//! be driven deterministically.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::traits::Transport;
use crate::manager::error::{ManagerError, Result};
use crate::manager::types::KeyDetails;
use crate::manager::validate::KeyName;

/// Stand-in key material: a random identifier and a creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryKey {
    pub material: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Errors to return instead of performing an operation.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    pub start: Option<ManagerError>,
    pub stop: Option<ManagerError>,
    pub generate: Option<ManagerError>,
    pub remove: Option<ManagerError>,
    pub list: Option<ManagerError>,
    pub test: Option<ManagerError>,
}

/// Record of the calls a console made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub started: usize,
    pub stopped: usize,
    pub generated: Vec<String>,
    pub removed: Vec<String>,
    pub described: Vec<String>,
    pub listed: usize,
    pub tested: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    keys: HashMap<KeyName, MemoryKey>,
    started: bool,
    unhealthy: bool,
    list_unsupported: bool,
    failures: FailurePlan,
    calls: Mutex<CallLog>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate keys. Invalid names are skipped.
    pub fn with_keys<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            if let Ok(name) = KeyName::parse(name) {
                self.keys.insert(name, new_key());
            }
        }
        self
    }

    pub fn with_failures(mut self, failures: FailurePlan) -> Self {
        self.failures = failures;
        self
    }

    /// Report unhealthy even after a successful start.
    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    /// Make `list_keys` behave like a transport without listing support.
    pub fn without_listing(mut self) -> Self {
        self.list_unsupported = true;
        self
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> CallLog {
        self.record().clone()
    }

    fn record(&self) -> MutexGuard<'_, CallLog> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        KeyName::parse(name).is_ok_and(|name| self.keys.contains_key(&name))
    }

    pub fn key(&self, name: &str) -> Option<&MemoryKey> {
        KeyName::parse(name).ok().and_then(|name| self.keys.get(&name))
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(ManagerError::Transport("transport not started".to_string()))
        }
    }
}

fn new_key() -> MemoryKey {
    MemoryKey {
        material: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn start(&mut self, _shutdown: CancellationToken) -> Result<()> {
        self.record().started += 1;
        if let Some(err) = self.failures.start.clone() {
            return Err(err);
        }
        self.started = true;
        debug!("Memory transport started with {} key(s)", self.keys.len());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.record().stopped += 1;
        self.started = false;
        match self.failures.stop.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.started && !self.unhealthy
    }

    async fn generate_key_pair(&mut self, name: &KeyName) -> Result<()> {
        self.record().generated.push(name.to_string());
        self.ensure_started()?;
        if let Some(err) = self.failures.generate.clone() {
            return Err(err);
        }
        if self.keys.contains_key(name) {
            return Err(ManagerError::DuplicateKey(name.to_string()));
        }
        self.keys.insert(name.clone(), new_key());
        Ok(())
    }

    async fn remove_key(&mut self, name: &KeyName) -> Result<()> {
        self.record().removed.push(name.to_string());
        self.ensure_started()?;
        if let Some(err) = self.failures.remove.clone() {
            return Err(err);
        }
        self.keys
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ManagerError::KeyNotFound(name.to_string()))
    }

    async fn list_keys(&self) -> Result<Vec<KeyName>> {
        self.record().listed += 1;
        self.ensure_started()?;
        if self.list_unsupported {
            return Err(ManagerError::NotImplemented("key listing"));
        }
        if let Some(err) = self.failures.list.clone() {
            return Err(err);
        }
        Ok(self.keys.keys().cloned().collect())
    }

    async fn describe_key(&self, name: &KeyName) -> Result<KeyDetails> {
        self.record().described.push(name.to_string());
        self.ensure_started()?;
        let key = self
            .keys
            .get(name)
            .ok_or_else(|| ManagerError::KeyNotFound(name.to_string()))?;
        Ok(KeyDetails {
            name: name.to_string(),
            algorithm: "memory".to_string(),
            fingerprint: format!("MEM:{}", key.material.simple()),
            comment: format!("{}@memory", name),
            created_at: key.created_at,
            location: None,
            size_bytes: None,
            public_key: format!("memory {}", key.material),
        })
    }

    async fn test_connection(&self) -> Result<()> {
        self.record().tested += 1;
        self.ensure_started()?;
        match self.failures.test.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
