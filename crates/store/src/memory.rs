//! In-memory credential store backed by a `HashMap` behind a `Mutex`.

use async_trait::async_trait;
use bridge_types::{CredentialStore, OAuthCredential, error::Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// A [`CredentialStore`] implementation for testing and ephemeral use.
pub struct MemoryCredentialStore {
    data: Mutex<HashMap<String, OAuthCredential>>,
}

impl MemoryCredentialStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<OAuthCredential>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, credential: &OAuthCredential) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), credential.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn get_all(&self) -> Result<HashMap<String, OAuthCredential>> {
        Ok(self.data.lock().unwrap().clone())
    }
}
