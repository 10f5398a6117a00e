//! Anthropic OAuth 2.0 PKCE authorization endpoints and request bodies.
//!
//! The gateway uses the Authorization Code + PKCE (S256) flow against the
//! developer console. The authorize URL redirects to the console's own
//! code-display page, so the user pastes `code#<verifier>` back into the
//! login UI instead of running a local callback server.

use serde_json::{Value, json};

/// Default OAuth 2.0 client id; overridable via `ANTHROPIC_OAUTH_CLIENT_ID`.
pub const CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";

/// Authorization endpoint.
pub const AUTH_URL: &str = "https://claude.ai/oauth/authorize";

/// Token endpoint at the developer console.
pub const TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";

/// Code-display redirect target on the console.
pub const REDIRECT_URI: &str = "https://console.anthropic.com/oauth/code/callback";

// Only request user-level scopes; org:create_api_key triggers an API Key
// creation flow that requires Console billing, which is unavailable for
// regular Claude subscriptions.

/// OAuth scopes requested during authorization.
pub const SCOPES: &[&str] = &["user:profile", "user:inference"];

// Scope encoding: `:` -> %3A, space -> +
const SCOPE_ENCODED: &str = "user%3Aprofile+user%3Ainference";
const REDIRECT_URI_ENCODED: &str =
    "https%3A%2F%2Fconsole.anthropic.com%2Foauth%2Fcode%2Fcallback";

/// Build the authorization URL with PKCE parameters.
///
/// The `state` parameter is set to the code verifier itself so the console
/// echoes it back appended to the code (`code#verifier`), which is how the
/// callback recovers it without server-side session storage.
#[must_use]
pub fn build_auth_url(client_id: &str, code_challenge: &str, verifier: &str) -> String {
    format!(
        "{AUTH_URL}?code=true&client_id={client_id}&response_type=code&redirect_uri={REDIRECT_URI_ENCODED}&scope={SCOPE_ENCODED}&code_challenge={code_challenge}&code_challenge_method=S256&state={verifier}",
    )
}

/// Build the JSON body for exchanging an authorization code for tokens.
#[must_use]
pub fn build_code_exchange(client_id: &str, code: &str, verifier: &str) -> Value {
    json!({
        "grant_type": "authorization_code",
        "client_id": client_id,
        "code": code,
        "redirect_uri": REDIRECT_URI,
        "code_verifier": verifier,
        "state": verifier,
    })
}

/// Build the JSON body for a refresh-token grant.
#[must_use]
pub fn build_refresh(client_id: &str, refresh_token: &str) -> Value {
    json!({
        "grant_type": "refresh_token",
        "refresh_token": refresh_token,
        "client_id": client_id,
    })
}

/// Split a pasted `code#verifier` string into its parts.
///
/// The verifier portion is absent when the user pasted a bare code.
#[must_use]
pub fn split_code(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((code, verifier)) => (code, Some(verifier)),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_contains_pkce_params() {
        let url = build_auth_url(CLIENT_ID, "challenge123", "verifier456");
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains(CLIENT_ID));
        assert!(url.contains("challenge123"));
        assert!(url.contains("state=verifier456"));
        assert!(url.contains("S256"));
        assert!(url.contains("code=true"));
    }

    #[test]
    fn test_code_exchange_fields() {
        let body = build_code_exchange(CLIENT_ID, "mycode", "myverifier");
        assert_eq!(body["grant_type"], "authorization_code");
        assert_eq!(body["client_id"], CLIENT_ID);
        assert_eq!(body["code"], "mycode");
        assert_eq!(body["code_verifier"], "myverifier");
        assert_eq!(body["redirect_uri"], REDIRECT_URI);
    }

    #[test]
    fn test_refresh_fields() {
        let body = build_refresh("cid", "rt");
        assert_eq!(body["grant_type"], "refresh_token");
        assert_eq!(body["refresh_token"], "rt");
        assert_eq!(body["client_id"], "cid");
    }

    #[test]
    fn test_split_code_with_fragment() {
        let (code, verifier) = split_code("abc#def");
        assert_eq!(code, "abc");
        assert_eq!(verifier, Some("def"));
    }

    #[test]
    fn test_split_code_bare() {
        let (code, verifier) = split_code("abc");
        assert_eq!(code, "abc");
        assert!(verifier.is_none());
    }

    #[test]
    fn test_split_code_keeps_later_hashes() {
        let (code, verifier) = split_code("abc#def#ghi");
        assert_eq!(code, "abc");
        assert_eq!(verifier, Some("def#ghi"));
    }
}
