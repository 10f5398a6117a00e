//! Credential lifecycle manager.
//!
//! Responsibilities:
//! - Re-read the stored credential on every access (the store is the
//!   single source of truth; nothing is cached in process).
//! - Detect expiry with a strict greater-than check and refresh through
//!   the console token endpoint.
//! - Exchange pasted authorization codes from the login UI.
//!
//! Concurrent callers may both observe an expired token and both refresh;
//! the store is last-writer-wins and the token endpoint tolerates the
//! second refresh.

use crate::claude;
use bridge_types::{
    BridgeError, CREDENTIAL_KEY, CredentialStore, OAuthCredential, error::Result, now_ms,
};
use serde_json::Value;
use std::sync::Arc;

pub struct OAuthManager {
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
    client_id: String,
}

impl OAuthManager {
    /// Create a manager over the given store, with an optional client-id
    /// override (falling back to the compile-time constant).
    pub fn new(
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
        client_id: Option<String>,
    ) -> Self {
        Self {
            store,
            http,
            client_id: client_id.unwrap_or_else(|| claude::CLIENT_ID.to_string()),
        }
    }

    /// The OAuth client id in effect.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Return a usable bearer access token, refreshing if necessary.
    ///
    /// Returns `None` when no credential is stored, the record is not an
    /// `"oauth"` record, or the token is expired with no refresh secret.
    ///
    /// # Errors
    ///
    /// Returns an error when a refresh was attempted and failed; callers
    /// surface that as an authentication failure.
    pub async fn access_token(&self) -> Result<Option<String>> {
        let Some(cred) = self.store.get(CREDENTIAL_KEY).await? else {
            return Ok(None);
        };
        if !cred.is_oauth() {
            return Ok(None);
        }
        if !cred.is_expired() {
            return Ok(Some(cred.access));
        }
        if cred.refresh.is_empty() {
            return Ok(None);
        }
        let refreshed = self.refresh(&cred).await?;
        Ok(Some(refreshed.access))
    }

    /// Whether a usable access token can currently be produced.
    pub async fn is_authenticated(&self) -> bool {
        matches!(self.access_token().await, Ok(Some(_)))
    }

    /// Exchange a pasted `code#verifier` string for tokens and persist the
    /// resulting credential.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Auth`] if the verifier is missing or the
    /// console rejects the exchange.
    pub async fn exchange_code(&self, raw_code: &str) -> Result<OAuthCredential> {
        let (code, verifier) = claude::split_code(raw_code);
        let verifier = verifier
            .ok_or_else(|| BridgeError::Auth("authorization code is missing its verifier".into()))?;
        let body = claude::build_code_exchange(&self.client_id, code, verifier);
        let json = self.post_token(&body).await?;
        let cred = credential_from_token_response(&json, None)?;
        self.store.set(CREDENTIAL_KEY, &cred).await?;
        tracing::info!("oauth credential stored");
        Ok(cred)
    }

    /// Remove the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    pub async fn logout(&self) -> Result<()> {
        self.store.remove(CREDENTIAL_KEY).await
    }

    async fn refresh(&self, cred: &OAuthCredential) -> Result<OAuthCredential> {
        let body = claude::build_refresh(&self.client_id, &cred.refresh);
        let json = self.post_token(&body).await?;
        let new_cred = credential_from_token_response(&json, Some(&cred.refresh))?;
        self.store.set(CREDENTIAL_KEY, &new_cred).await?;
        tracing::info!("oauth token refreshed");
        Ok(new_cred)
    }

    async fn post_token(&self, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(claude::TOKEN_URL)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BridgeError::Auth(format!(
                "token endpoint returned {status}: {text}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| BridgeError::Auth(format!("invalid token response: {e}")))
    }
}

/// Build a credential from a token-endpoint response.
///
/// `expires` is computed as `now + expires_in * 1000`. The previous
/// refresh secret is retained when the response omits a new one.
fn credential_from_token_response(
    json: &Value,
    previous_refresh: Option<&str>,
) -> Result<OAuthCredential> {
    let access = json
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::Auth("missing access_token in token response".into()))?;
    let refresh = json
        .get("refresh_token")
        .and_then(Value::as_str)
        .or(previous_refresh)
        .unwrap_or_default();
    let expires_in = json
        .get("expires_in")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(OAuthCredential::new(
        access,
        refresh,
        now_ms() + expires_in * 1000,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_store::MemoryCredentialStore;
    use serde_json::json;

    fn make_manager() -> (Arc<MemoryCredentialStore>, OAuthManager) {
        let store = Arc::new(MemoryCredentialStore::new());
        let manager = OAuthManager::new(store.clone(), reqwest::Client::new(), None);
        (store, manager)
    }

    #[tokio::test]
    async fn test_access_token_none_when_empty() {
        let (_store, m) = make_manager();
        assert!(m.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_access_token_valid_passthrough() {
        let (store, m) = make_manager();
        store
            .set(
                CREDENTIAL_KEY,
                &OAuthCredential::new("at", "rt", now_ms() + 60_000),
            )
            .await
            .unwrap();
        assert_eq!(m.access_token().await.unwrap().as_deref(), Some("at"));
    }

    #[tokio::test]
    async fn test_access_token_rejects_non_oauth_record() {
        let (store, m) = make_manager();
        let mut cred = OAuthCredential::new("at", "rt", now_ms() + 60_000);
        cred.kind = "api_key".to_string();
        store.set(CREDENTIAL_KEY, &cred).await.unwrap();
        assert!(m.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_access_token_expired_without_refresh_is_none() {
        let (store, m) = make_manager();
        store
            .set(CREDENTIAL_KEY, &OAuthCredential::new("at", "", 1))
            .await
            .unwrap();
        assert!(m.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_is_authenticated() {
        let (store, m) = make_manager();
        assert!(!m.is_authenticated().await);
        store
            .set(
                CREDENTIAL_KEY,
                &OAuthCredential::new("at", "rt", now_ms() + 60_000),
            )
            .await
            .unwrap();
        assert!(m.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_removes_credential() {
        let (store, m) = make_manager();
        store
            .set(
                CREDENTIAL_KEY,
                &OAuthCredential::new("at", "rt", now_ms() + 60_000),
            )
            .await
            .unwrap();
        m.logout().await.unwrap();
        assert!(!m.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_exchange_requires_verifier() {
        let (_store, m) = make_manager();
        let err = m.exchange_code("bare-code").await.unwrap_err();
        assert!(err.to_string().contains("verifier"));
    }

    #[test]
    fn test_credential_from_token_response_full() {
        let before = now_ms();
        let cred = credential_from_token_response(
            &json!({"access_token": "at2", "refresh_token": "rt2", "expires_in": 3600}),
            Some("rt1"),
        )
        .unwrap();
        assert_eq!(cred.access, "at2");
        assert_eq!(cred.refresh, "rt2");
        assert!(cred.expires >= before + 3_600_000);
        assert!(cred.expires <= now_ms() + 3_600_000);
    }

    #[test]
    fn test_credential_retains_previous_refresh() {
        let cred = credential_from_token_response(
            &json!({"access_token": "at2", "expires_in": 60}),
            Some("rt1"),
        )
        .unwrap();
        assert_eq!(cred.refresh, "rt1");
    }

    #[test]
    fn test_credential_missing_access_token_errors() {
        assert!(credential_from_token_response(&json!({"expires_in": 60}), None).is_err());
    }

    #[test]
    fn test_client_id_override() {
        let store = Arc::new(MemoryCredentialStore::new());
        let m = OAuthManager::new(store, reqwest::Client::new(), Some("custom-id".into()));
        assert_eq!(m.client_id(), "custom-id");
    }
}
