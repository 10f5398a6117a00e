//! Local JSON-file credential store.
//!
//! Persists the full `{key: credential}` map to `.auth_data.json` in the
//! working directory, pretty-printed, with a full read-modify-write on
//! every mutation. The file handle is never kept open; each operation is
//! an atomic open-read-close or open-write-close.

use async_trait::async_trait;
use bridge_types::{BridgeError, CredentialStore, OAuthCredential, error::Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default file name, relative to the working directory.
pub const AUTH_DATA_FILE: &str = ".auth_data.json";

/// A [`CredentialStore`] backed by a single pretty-printed JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at `<cwd>/.auth_data.json`.
    #[must_use]
    pub fn in_cwd() -> Self {
        Self::new(AUTH_DATA_FILE)
    }

    /// Read the whole map; any read or parse failure yields an empty map.
    async fn read_map(&self) -> HashMap<String, OAuthCredential> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    /// Serialise and write the whole map. Write failures propagate.
    async fn write_map(&self, map: &HashMap<String, OAuthCredential>) -> Result<()> {
        let text = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| BridgeError::Storage(format!("write {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<OAuthCredential>> {
        Ok(self.read_map().await.remove(key))
    }

    async fn set(&self, key: &str, credential: &OAuthCredential) -> Result<()> {
        let mut map = self.read_map().await;
        map.insert(key.to_string(), credential.clone());
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map().await;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<HashMap<String, OAuthCredential>> {
        Ok(self.read_map().await)
    }
}
