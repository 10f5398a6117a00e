//! OAuth credential record and expiry logic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Store key under which the single gateway credential lives.
pub const CREDENTIAL_KEY: &str = "anthropic";

/// The OAuth credential persisted by the login flow and rotated by refresh.
///
/// `expires` is an absolute instant in milliseconds since the Unix epoch,
/// never a duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthCredential {
    /// Discriminator, always `"oauth"` for records written by this gateway.
    #[serde(rename = "type")]
    pub kind: String,
    /// Refresh secret used to mint new access tokens.
    pub refresh: String,
    /// Current bearer access token.
    pub access: String,
    /// Absolute expiry in milliseconds since the Unix epoch.
    pub expires: u64,
}

impl OAuthCredential {
    /// Create an `"oauth"` credential from its parts.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>, expires: u64) -> Self {
        Self {
            kind: "oauth".to_string(),
            refresh: refresh.into(),
            access: access.into(),
            expires,
        }
    }

    /// Whether the record carries the `"oauth"` discriminator.
    #[must_use]
    pub fn is_oauth(&self) -> bool {
        self.kind == "oauth"
    }

    /// Whether the credential is expired at the given instant.
    ///
    /// An `expires` equal to `now` counts as expired; only a strictly
    /// future expiry is usable.
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires <= now
    }

    /// Whether the credential is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_kind() {
        let c = OAuthCredential::new("at", "rt", 123);
        assert!(c.is_oauth());
        assert_eq!(c.access, "at");
        assert_eq!(c.refresh, "rt");
        assert_eq!(c.expires, 123);
    }

    #[test]
    fn test_expiry_strictly_greater_than() {
        let c = OAuthCredential::new("at", "rt", 1_000);
        assert!(c.is_expired_at(1_000), "expires == now counts as expired");
        assert!(c.is_expired_at(1_001));
        assert!(!c.is_expired_at(999));
    }

    #[test]
    fn test_future_expiry_not_expired() {
        let c = OAuthCredential::new("at", "rt", now_ms() + 3_600_000);
        assert!(!c.is_expired());
    }

    #[test]
    fn test_serde_field_names() {
        let c = OAuthCredential::new("at", "rt", 42);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "oauth");
        assert_eq!(json["refresh"], "rt");
        assert_eq!(json["access"], "at");
        assert_eq!(json["expires"], 42);
    }

    #[test]
    fn test_serde_roundtrip() {
        let c = OAuthCredential::new("at", "rt", 42);
        let json = serde_json::to_string(&c).unwrap();
        let back: OAuthCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access, c.access);
        assert_eq!(back.expires, c.expires);
    }
}
