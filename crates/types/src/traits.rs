//! Async traits shared across all bridge crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `bridge-types`, not on each other.

use crate::{BridgeError, OAuthCredential};
use async_trait::async_trait;
use std::collections::HashMap;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Persistent storage for the gateway's OAuth credential.
///
/// The store is the single source of truth: callers re-read before every
/// use and writes are last-writer-wins. No cross-process locking is
/// required because the login flow is the sole interactive writer.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential stored under `key`, if one exists.
    ///
    /// Backend read failures are reported as "not found".
    async fn get(&self, key: &str) -> Result<Option<OAuthCredential>>;
    /// Persist a credential under `key`, replacing any previous value.
    async fn set(&self, key: &str, credential: &OAuthCredential) -> Result<()>;
    /// Remove the credential stored under `key`.
    async fn remove(&self, key: &str) -> Result<()>;
    /// Load every stored credential keyed by its store key.
    async fn get_all(&self) -> Result<HashMap<String, OAuthCredential>>;
}

/// Minimal key-value surface backing the thinking cache's persistent tier.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the string value at `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write `value` at `key` with a time-to-live in seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}
