//! OAuth authentication for the claude-bridge gateway.
//!
//! [`claude`] holds the fixed developer-console endpoints, PKCE URL
//! building, and token-exchange bodies; [`OAuthManager`] owns the
//! credential lifecycle (load, strict-expiry check, refresh, logout).

pub mod claude;
pub mod manager;
pub mod pkce;

pub use manager::OAuthManager;
