//! Descriptive key information returned by transports.

use chrono::{DateTime, Utc};

/// Public details about one key, rendered by the `show` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDetails {
    pub name: String,
    /// Algorithm name, e.g. `ssh-ed25519`
    pub algorithm: String,
    /// SHA256 fingerprint in OpenSSH format
    pub fingerprint: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    /// Location of the private key, when the transport stores keys on disk
    pub location: Option<String>,
    /// Size of the stored private key in bytes
    pub size_bytes: Option<u64>,
    /// Public key in authorized_keys format
    pub public_key: String,
}

impl KeyDetails {
    /// Render as indented `label: value` lines.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            format!("  Name:        {}", self.name),
            format!("  Type:        {}", self.algorithm),
            format!("  Fingerprint: {}", self.fingerprint),
            format!("  Comment:     {}", self.comment),
            format!("  Created:     {}", format_time(&self.created_at)),
        ];
        if let Some(location) = &self.location {
            lines.push(format!("  Location:    {}", location));
        }
        if let Some(size) = self.size_bytes {
            lines.push(format!("  Size:        {}", format_key_size(size)));
        }
        lines.push(format!("  Public key:  {}", self.public_key));
        lines
    }
}

/// Human-readable byte size using binary units (`512 B`, `1.5 KB`).
pub fn format_key_size(size: u64) -> String {
    const UNIT: u64 = 1024;
    if size < UNIT {
        return format!("{} B", size);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", size as f64 / div as f64, prefix)
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
