//! Token persistence under well-known keys.

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const ACCESS_EXPIRES_AT_KEY: &str = "access_expires_at";

/// The persisted token triple. Serialized field names are the well-known
/// keys above; `access_expires_at` is a unix timestamp in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: i64,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.access_expires_at
    }
}

/// Holds the session's credentials, optionally backed by a JSON file so
/// they survive restarts. Without a path it is purely in-memory (used in
/// tests and throwaway sessions).
#[derive(Debug, Default)]
pub struct TokenStore {
    path: Option<PathBuf>,
    cached: Option<Credentials>,
}

impl TokenStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a file-backed store, loading existing credentials if the
    /// file is present and parseable.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok());
        Self {
            path: Some(path),
            cached,
        }
    }

    pub fn get(&self) -> Option<&Credentials> {
        self.cached.as_ref()
    }

    pub fn save(&mut self, credentials: Credentials) -> io::Result<()> {
        if let Some(path) = &self.path {
            let contents = serde_json::to_string_pretty(&credentials)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            std::fs::write(path, contents)?;
        }
        self.cached = Some(credentials);
        Ok(())
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.cached = None;
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
                _ => {}
            }
        }
        Ok(())
    }
}
