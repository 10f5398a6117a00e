//! Core types and traits for the claude-bridge workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! bridge, including the error type, the OAuth credential record, content
//! block representations, and the async traits implemented by the storage
//! backends.

pub mod content;
pub mod credential;
pub mod error;
pub mod traits;

pub use content::{ContentBlock, ThinkingBlock};
pub use credential::{CREDENTIAL_KEY, OAuthCredential, now_ms};
pub use error::BridgeError;
pub use traits::{CredentialStore, KvStore};
