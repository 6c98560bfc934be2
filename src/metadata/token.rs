use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::storage::pages::write_atomic;

pub const TOKEN_FILE: &str = "anilist_token.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    /// Unix seconds
    #[serde(default)]
    expiry: i64,
}

/// Persisted AniList access token (`anilist_token.json`)
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(data_root: &Path) -> Self {
        Self {
            path: data_root.join(TOKEN_FILE),
        }
    }

    /// The stored token, if present and not yet expired
    pub fn load(&self) -> Option<String> {
        let raw = std::fs::read(&self.path).ok()?;
        let stored: StoredToken = match serde_json::from_slice(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not load AniList token");
                return None;
            }
        };

        if stored.expiry > OffsetDateTime::now_utc().unix_timestamp() && !stored.token.is_empty() {
            info!("Found valid cached AniList token");
            Some(stored.token)
        } else {
            warn!("AniList token expired");
            None
        }
    }

    pub async fn store(&self, token: &str, expires_in: Duration) -> std::io::Result<()> {
        let expires_in = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
        let stored = StoredToken {
            token: token.to_string(),
            expiry: OffsetDateTime::now_utc()
                .unix_timestamp()
                .saturating_add(expires_in),
        };
        let bytes = serde_json::to_vec(&stored)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&self.path, &bytes)
            .await
            .map_err(std::io::Error::other)?;
        info!("AniList token saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path());
        assert_eq!(store.load(), None);

        store.store("abc", Duration::from_secs(3600)).await.unwrap();
        assert_eq!(store.load().as_deref(), Some("abc"));
    }

    #[test]
    fn test_expired_or_corrupt_token_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path());

        std::fs::write(temp_dir.path().join(TOKEN_FILE), br#"{"token":"old","expiry":1}"#).unwrap();
        assert_eq!(store.load(), None);

        std::fs::write(temp_dir.path().join(TOKEN_FILE), b"garbage").unwrap();
        assert_eq!(store.load(), None);
    }
}
