//! On-disk key storage for the SSH transport.
//!
//! Each key pair lives in the key directory as two files:
//! `<name><private_key_ext>` (OpenSSH private key, mode 0600) and
//! `<name><public_key_ext>` (authorized_keys line, mode 0644). Loaded keys
//! are indexed in a `DashMap` keyed by [`KeyName`].
//!
//! A key is registered only after both files are written, and deregistered
//! only after both are deleted, so a failed operation never leaves the index
//! disagreeing with the directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use russh::keys::ssh_key::LineEnding;
use russh::keys::ssh_key::rand_core::OsRng;
use russh::keys::{self, Algorithm, HashAlg, PrivateKey};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::config::{KeyAlgorithm, KeyStorageConfig};
use super::error::{ManagerError, Result};
use super::types::KeyDetails;
use super::validate::KeyName;

/// A loaded key pair and where it is stored.
#[derive(Debug, Clone)]
pub(crate) struct StoredKey {
    pub key: Arc<PrivateKey>,
    pub created_at: DateTime<Utc>,
    pub private_path: PathBuf,
    pub public_path: PathBuf,
}

#[derive(Debug)]
pub(crate) struct KeyRing {
    config: KeyStorageConfig,
    keys: DashMap<KeyName, StoredKey>,
}

impl KeyRing {
    /// Create the key directory if needed and load every key found in it.
    pub async fn open(config: &KeyStorageConfig) -> Result<Self> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&config.key_dir).await.map_err(|e| {
            ManagerError::Transport(format!(
                "failed to create key directory {}: {}",
                config.key_dir.display(),
                e
            ))
        })?;

        let ring = Self {
            config: config.clone(),
            keys: DashMap::new(),
        };
        let loaded = ring.load_existing().await?;
        info!(
            "Loaded {} SSH key(s) from {}",
            loaded,
            config.key_dir.display()
        );
        Ok(ring)
    }

    async fn load_existing(&self) -> Result<usize> {
        let dir = &self.config.key_dir;
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            ManagerError::Transport(format!(
                "failed to read key directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut loaded = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ManagerError::Transport(format!("failed to read key directory: {}", e)))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|f| f.strip_suffix(self.config.private_key_ext.as_str()))
            else {
                continue;
            };

            let name = match KeyName::parse(stem) {
                Ok(name) => name,
                Err(_) => {
                    warn!("Skipping key file with invalid name: {:?}", file_name);
                    continue;
                }
            };

            match self.load_key(&name, &entry.path()).await {
                Ok(stored) => {
                    self.keys.insert(name, stored);
                    loaded += 1;
                }
                Err(e) => warn!("Failed to load key {}: {}", name, e),
            }
        }

        Ok(loaded)
    }

    async fn load_key(&self, name: &KeyName, path: &Path) -> std::result::Result<StoredKey, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read private key: {}", e))?;
        let key = keys::decode_secret_key(&contents, None)
            .map_err(|e| format!("failed to decode private key: {}", e))?;

        let created_at = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredKey {
            key: Arc::new(key),
            created_at,
            private_path: path.to_path_buf(),
            public_path: self.public_key_path(name),
        })
    }

    pub fn private_key_path(&self, name: &KeyName) -> PathBuf {
        self.config
            .key_dir
            .join(format!("{}{}", name, self.config.private_key_ext))
    }

    pub fn public_key_path(&self, name: &KeyName) -> PathBuf {
        self.config
            .key_dir
            .join(format!("{}{}", name, self.config.public_key_ext))
    }

    pub fn contains(&self, name: &KeyName) -> bool {
        self.keys.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn names(&self) -> Vec<KeyName> {
        self.keys.iter().map(|entry| entry.key().clone()).collect()
    }

    /// All private keys, for public-key authentication.
    pub fn signing_keys(&self) -> Vec<(KeyName, Arc<PrivateKey>)> {
        self.keys
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(&entry.value().key)))
            .collect()
    }

    /// Generate a new key pair and persist it.
    pub async fn generate(&self, name: &KeyName) -> Result<()> {
        let private_path = self.private_key_path(name);
        let public_path = self.public_key_path(name);

        if self.contains(name) || path_exists(&private_path).await {
            return Err(ManagerError::DuplicateKey(name.to_string()));
        }

        let algorithm = match self.config.algorithm {
            KeyAlgorithm::Ed25519 => Algorithm::Ed25519,
            KeyAlgorithm::Rsa => Algorithm::Rsa { hash: None },
        };
        let comment = format!("{}@{}", name, self.config.comment_domain);

        // RSA generation takes long enough to stall the runtime.
        let key = tokio::task::spawn_blocking(move || {
            let mut key = PrivateKey::random(&mut OsRng, algorithm)?;
            key.set_comment(comment);
            Ok::<_, keys::ssh_key::Error>(key)
        })
        .await
        .map_err(|e| ManagerError::Transport(format!("key generation task failed: {}", e)))?
        .map_err(|e| ManagerError::Transport(format!("failed to generate private key: {}", e)))?;

        let private_pem = key
            .to_openssh(LineEnding::LF)
            .map_err(|e| ManagerError::Transport(format!("failed to encode private key: {}", e)))?;
        let public_line = key
            .public_key()
            .to_openssh()
            .map_err(|e| ManagerError::Transport(format!("failed to encode public key: {}", e)))?;

        write_new_file(&private_path, private_pem.as_bytes(), 0o600)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ManagerError::DuplicateKey(name.to_string()),
                _ => ManagerError::Transport(format!(
                    "failed to write private key {}: {}",
                    private_path.display(),
                    e
                )),
            })?;

        if let Err(e) = write_public_file(&public_path, format!("{}\n", public_line).as_bytes()).await
        {
            if let Err(cleanup) = remove_if_present(&private_path).await {
                warn!(
                    "Failed to clean up private key {} after error: {}",
                    private_path.display(),
                    cleanup
                );
            }
            return Err(ManagerError::Transport(format!(
                "failed to write public key {}: {}",
                public_path.display(),
                e
            )));
        }

        self.keys.insert(
            name.clone(),
            StoredKey {
                key: Arc::new(key),
                created_at: Utc::now(),
                private_path,
                public_path,
            },
        );
        info!("Generated SSH key pair {}", name);
        Ok(())
    }

    /// Delete both key files and forget the key.
    pub async fn remove(&self, name: &KeyName) -> Result<()> {
        let (private_path, public_path) = match self.keys.get(name) {
            Some(entry) => (entry.private_path.clone(), entry.public_path.clone()),
            None => return Err(ManagerError::KeyNotFound(name.to_string())),
        };

        // Public half first: if the private delete then fails the key still works.
        remove_if_present(&public_path).await.map_err(|e| {
            ManagerError::Transport(format!(
                "failed to remove public key {}: {}",
                public_path.display(),
                e
            ))
        })?;
        remove_if_present(&private_path).await.map_err(|e| {
            ManagerError::Transport(format!(
                "failed to remove private key {}: {}",
                private_path.display(),
                e
            ))
        })?;

        self.keys.remove(name);
        info!("Removed SSH key pair {}", name);
        Ok(())
    }

    pub async fn details(&self, name: &KeyName) -> Result<KeyDetails> {
        let stored = self
            .keys
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ManagerError::KeyNotFound(name.to_string()))?;

        let public_key = stored
            .key
            .public_key()
            .to_openssh()
            .map_err(|e| ManagerError::Transport(format!("failed to encode public key: {}", e)))?;
        let size_bytes = tokio::fs::metadata(&stored.private_path)
            .await
            .map(|m| m.len())
            .ok();

        Ok(KeyDetails {
            name: name.to_string(),
            algorithm: stored.key.algorithm().as_str().to_string(),
            fingerprint: stored.key.public_key().fingerprint(HashAlg::Sha256).to_string(),
            comment: stored.key.comment().to_string(),
            created_at: stored.created_at,
            location: Some(stored.private_path.display().to_string()),
            size_bytes,
            public_key,
        })
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn write_new_file(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Public keys may replace a stale file left behind by an earlier partial removal.
async fn write_public_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    remove_if_present(path).await?;
    write_new_file(path, contents, 0o644).await
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
