//! Upstash REST key-value client.
//!
//! Speaks the Upstash Redis REST protocol (`GET {base}/get/{key}` and
//! friends, bearer-authenticated, every response wrapped in
//! `{"result": …}`). One client serves two roles: the credential store's
//! remote backend and the thinking cache's persistent tier.
//!
//! Keys must be URL-safe; every key this gateway writes is built from
//! `[A-Za-z0-9:._-]` only.

use async_trait::async_trait;
use bridge_types::{BridgeError, CredentialStore, KvStore, OAuthCredential, error::Result};
use serde_json::Value;
use std::collections::HashMap;

/// Namespace prefix for credential records.
const CRED_PREFIX: &str = "cred:";

/// REST client for an Upstash Redis database.
#[derive(Clone)]
pub struct UpstashStore {
    base: String,
    token: String,
    http: reqwest::Client,
}

impl UpstashStore {
    /// Create a client for the given REST endpoint and token.
    #[must_use]
    pub fn new(base: impl Into<String>, token: impl Into<String>, http: reqwest::Client) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            token: token.into(),
            http,
        }
    }

    /// Issue a single REST command, returning the `result` field.
    async fn command(&self, path: &str, body: Option<String>) -> Result<Value> {
        let url = format!("{}/{path}", self.base);
        let builder = match body {
            Some(b) => self.http.post(&url).body(b),
            None => self.http.get(&url),
        };
        let resp = builder
            .header("authorization", format!("Bearer {}", self.token))
            .send()
            .await?;
        let status = resp.status();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| BridgeError::Storage(format!("upstash response: {e}")))?;
        if !status.is_success() {
            let err = json
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(BridgeError::Storage(format!(
                "upstash {path} failed ({status}): {err}"
            )));
        }
        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Read a raw string value.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let result = self.command(&format!("get/{key}"), None).await?;
        Ok(result.as_str().map(str::to_string))
    }

    /// Write a raw string value with no expiry.
    pub async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.command(&format!("set/{key}"), Some(value.to_string()))
            .await?;
        Ok(())
    }

    /// Write a raw string value with a time-to-live in seconds.
    pub async fn setex_raw(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        self.command(&format!("setex/{key}/{ttl_secs}"), Some(value.to_string()))
            .await?;
        Ok(())
    }

    /// Delete a key.
    pub async fn del_raw(&self, key: &str) -> Result<()> {
        self.command(&format!("del/{key}"), None).await?;
        Ok(())
    }

    /// List keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let result = self.command(&format!("keys/{pattern}"), None).await?;
        Ok(result
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CredentialStore for UpstashStore {
    /// Read errors degrade to "not found" so a flaky remote never blocks
    /// the request path.
    async fn get(&self, key: &str) -> Result<Option<OAuthCredential>> {
        let raw = match self.get_raw(&format!("{CRED_PREFIX}{key}")).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("upstash credential read failed: {e}");
                return Ok(None);
            }
        };
        Ok(raw.and_then(|text| serde_json::from_str(&text).ok()))
    }

    async fn set(&self, key: &str, credential: &OAuthCredential) -> Result<()> {
        let text = serde_json::to_string(credential)?;
        self.set_raw(&format!("{CRED_PREFIX}{key}"), &text).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.del_raw(&format!("{CRED_PREFIX}{key}")).await
    }

    async fn get_all(&self) -> Result<HashMap<String, OAuthCredential>> {
        let mut out = HashMap::new();
        for full_key in self.keys(&format!("{CRED_PREFIX}*")).await? {
            let Some(short) = full_key.strip_prefix(CRED_PREFIX) else {
                continue;
            };
            if let Some(cred) = CredentialStore::get(self, short).await? {
                out.insert(short.to_string(), cred);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.setex_raw(key, ttl_secs, value).await
    }
}
