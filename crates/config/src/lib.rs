//! Configuration loading for the claude-bridge gateway.
//!
//! Uses figment to layer environment variables over serialized defaults.
//! All settings come from the process environment; there is no config file.

use bridge_types::{BridgeError, error::Result};
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables read through figment. `DEBUG` is read directly
/// because values like `1` would otherwise be type-guessed as numbers.
const ENV_KEYS: &[&str] = &[
    "PORT",
    "API_KEY",
    "ANTHROPIC_OAUTH_CLIENT_ID",
    "UPSTASH_REDIS_REST_URL",
    "UPSTASH_REDIS_REST_TOKEN",
    "THINKING_CACHE_TTL_DAYS",
];

/// Gateway configuration, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listening port.
    pub port: u16,
    /// Optional inbound bearer gate; absent means no auth check.
    pub api_key: Option<String>,
    /// Override for the compile-time OAuth client id.
    pub anthropic_oauth_client_id: Option<String>,
    /// Upstash REST endpoint enabling the persistent tiers.
    pub upstash_redis_rest_url: Option<String>,
    /// Upstash REST bearer token.
    pub upstash_redis_rest_token: Option<String>,
    /// Time-to-live for persisted thinking-cache entries, in days.
    pub thinking_cache_ttl_days: u64,
    /// Raw DEBUG value; see [`Config::debug_enabled`].
    pub debug: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9095,
            api_key: None,
            anthropic_oauth_client_id: None,
            upstash_redis_rest_url: None,
            upstash_redis_rest_token: None,
            thinking_cache_ttl_days: 10,
            debug: None,
        }
    }
}

impl Config {
    /// Resolve the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if a variable cannot be coerced to
    /// its field type (e.g. a non-numeric `PORT`).
    pub fn from_env() -> Result<Self> {
        let mut config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(
                Env::raw()
                    .only(ENV_KEYS)
                    .map(|key| key.as_str().to_ascii_lowercase().into()),
            )
            .extract()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        config.debug = std::env::var("DEBUG").ok();
        Ok(config)
    }

    /// The Upstash endpoint, if configured with real (non-placeholder) values.
    #[must_use]
    pub fn upstash(&self) -> Option<(&str, &str)> {
        let url = self.upstash_redis_rest_url.as_deref()?;
        let token = self.upstash_redis_rest_token.as_deref()?;
        if is_placeholder(url) || is_placeholder(token) {
            return None;
        }
        Some((url, token))
    }

    /// The configured thinking-cache TTL as a duration.
    #[must_use]
    pub fn thinking_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.thinking_cache_ttl_days * 24 * 60 * 60)
    }

    /// Whether debug logging was requested.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        matches!(
            self.debug.as_deref().map(str::trim),
            Some("1" | "true" | "TRUE" | "yes" | "debug")
        )
    }
}

/// Values the sample env file ships with; treated as absent.
fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.starts_with("your-") || v.starts_with("YOUR_") || v.contains("placeholder")
}
