//! Secret handling and credential loading from local `.env` files.
//!
//! Secrets never appear in `Debug` output. Dotenv files are read into a
//! private map instead of mutating the process environment, so config
//! overrides can consult them after the real environment.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

/// Dotenv files consulted at startup, highest precedence first.
pub const DEFAULT_ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// A secret string whose `Debug` output is redacted.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a raw secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Only call this at the point of use.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret([REDACTED])")
        }
    }
}

/// Basic-auth credentials for the messaging channel's media storage.
#[derive(Debug, Clone)]
pub struct ChannelCredentials {
    /// Account identifier (basic-auth user).
    pub account_sid: String,
    /// Auth token (basic-auth password).
    pub auth_token: Secret,
}

/// Key-value pairs loaded from dotenv files.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Load credentials from a single dotenv file.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be parsed.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials::from_map(vars))
}

/// Load and merge several dotenv files. Missing files are skipped; earlier
/// files win over later ones for duplicate keys.
///
/// # Errors
///
/// Returns an error if an existing file cannot be parsed.
pub fn load_env_files<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Credentials> {
    let mut merged = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "dotenv file not found, skipping");
            continue;
        }
        let loaded = load_credentials(path)?;
        debug!(path = %path.display(), entries = loaded.len(), "dotenv file loaded");
        for (key, value) in loaded.vars {
            merged.entry(key).or_insert(value);
        }
    }
    Ok(Credentials::from_map(merged))
}
