//! Login UI and OAuth HTTP routes.

use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use bridge_auth::{claude, pkce};
use serde_json::{Value, json};
use std::sync::Arc;

/// Embedded login page served at `/` and `/index.html`.
const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>claude-bridge login</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; padding: 0 1rem; }
    button { padding: 0.5rem 1rem; }
    input { width: 100%; padding: 0.5rem; margin: 0.5rem 0; box-sizing: border-box; }
    #status { margin-top: 1rem; }
  </style>
</head>
<body>
  <h1>claude-bridge</h1>
  <p>Authorize the gateway with your Anthropic account, then paste the code shown by the console below.</p>
  <button id="start">Open login page</button>
  <input id="code" placeholder="Paste code (looks like xxxx#yyyy)">
  <button id="submit">Submit code</button>
  <div id="status"></div>
  <script>
    const status = (msg) => document.getElementById('status').textContent = msg;
    document.getElementById('start').onclick = async () => {
      const res = await fetch('/auth/oauth/start', { method: 'POST' });
      const data = await res.json();
      if (data.success) { window.open(data.authUrl, '_blank'); status('Complete the login, then paste the code.'); }
      else { status('Failed to start login.'); }
    };
    document.getElementById('submit').onclick = async () => {
      const code = document.getElementById('code').value.trim();
      const res = await fetch('/auth/oauth/callback', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ code }),
      });
      const data = await res.json();
      status(data.success ? 'Logged in. You can close this tab.' : 'Login failed: ' + (data.error || 'unknown'));
    };
  </script>
</body>
</html>
"#;

/// Handles `GET /` and `GET /index.html`.
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_HTML)
}

/// Handles `POST /auth/oauth/start`.
///
/// Generates a PKCE pair and returns the authorization URL. The verifier
/// doubles as the `state` parameter, so the console hands it back appended
/// to the code and no server-side session is needed.
pub async fn oauth_start(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (verifier, challenge) = pkce::generate_pkce();
    let auth_url = claude::build_auth_url(state.auth.client_id(), &challenge, &verifier);
    Json(json!({
        "success": true,
        "authUrl": auth_url,
        "sessionId": pkce::session_id(),
    }))
}

/// Handles `POST /auth/login/start`.
///
/// There is no headless variant of the console flow, so this returns the
/// same authorization URL as [`oauth_start`] for the UI to open.
pub async fn login_start(State(state): State<Arc<AppState>>) -> Json<Value> {
    oauth_start(State(state)).await
}

/// Handles `POST /auth/oauth/callback` with body `{"code": "xxxx#yyyy"}`.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let Some(code) = code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "missing 'code'"})),
        )
            .into_response();
    };
    match state.auth.exchange_code(code).await {
        Ok(_) => Json(json!({"success": true})).into_response(),
        Err(e) => {
            tracing::warn!("oauth code exchange failed: {e}");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Handles `GET /auth/logout`.
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    state.auth.logout().await?;
    Ok(Json(json!({"success": true})))
}

/// Handles `GET /auth/status`.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({"authenticated": state.auth.is_authenticated().await}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_page_mentions_routes_it_calls() {
        assert!(LOGIN_HTML.contains("/auth/oauth/start"));
        assert!(LOGIN_HTML.contains("/auth/oauth/callback"));
    }
}
