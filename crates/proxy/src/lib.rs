//! HTTP surface of the gateway: axum router, shared state, and the
//! miscellaneous status/fallback routes.
//!
//! The main path is `/v1/chat/completions` and `/v1/messages` (one shared
//! pipeline, format-detected); around it sit the login UI, the OAuth
//! routes, the models listing, and a permissive CORS layer for IDE
//! clients.

mod auth_routes;
mod chat;
mod context;
mod error;
mod models;
mod probe;
mod variant;

pub use chat::PERSONA;
pub use error::ApiError;
pub use variant::{ModelVariant, resolve};

use axum::{
    Json,
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use bridge_auth::OAuthManager;
use bridge_cache::ThinkingCache;
use bridge_config::Config;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tower_http::cors::CorsLayer;

/// Shared application state passed to all route handlers.
pub struct AppState {
    /// Resolved environment configuration.
    pub config: Arc<Config>,
    /// Credential lifecycle manager.
    pub auth: Arc<OAuthManager>,
    /// Two-tier thinking-block cache.
    pub cache: Arc<ThinkingCache>,
    /// HTTP client for upstream requests.
    pub http: reqwest::Client,
    /// Briefly cached `/v1/models` payload.
    pub models_cache: Mutex<Option<(Instant, Value)>>,
}

impl AppState {
    /// Creates the shared state wrapped in an `Arc`.
    pub fn new(
        config: Config,
        auth: Arc<OAuthManager>,
        cache: Arc<ThinkingCache>,
        http: reqwest::Client,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            auth,
            cache,
            http,
            models_cache: Mutex::new(None),
        })
    }
}

/// Build the full axum router.
pub fn make_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(auth_routes::login_page))
        .route("/index.html", get(auth_routes::login_page))
        .route("/auth/oauth/start", post(auth_routes::oauth_start))
        .route("/auth/oauth/callback", post(auth_routes::oauth_callback))
        .route("/auth/login/start", post(auth_routes::login_start))
        .route("/auth/logout", get(auth_routes::logout))
        .route("/auth/status", get(auth_routes::status))
        .route("/v1", get(service_status))
        .route("/v1/models", get(models::list_models))
        .route(
            "/v1/chat/completions",
            post(chat::chat_completions).get(method_not_allowed),
        )
        .route("/v1/messages", post(chat::messages).get(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Handles `GET /v1`.
async fn service_status(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "claude-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "thinking_cache": {
            "persistent": state.cache.has_persistent_tier(),
            "local_entries": state.cache.local_len(),
        },
    }))
}

/// GET on the completion routes gets guidance instead of a bare 405.
async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": {
                "message": "use POST with a chat-completion body on this endpoint",
                "type": "invalid_request_error",
                "code": "method_not_allowed",
            }
        })),
    )
}

/// Unknown paths list what the gateway serves.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "message": "unknown endpoint",
                "type": "invalid_request_error",
                "code": "not_found",
            },
            "endpoints": [
                "GET /",
                "POST /auth/oauth/start",
                "POST /auth/oauth/callback",
                "POST /auth/login/start",
                "GET /auth/logout",
                "GET /auth/status",
                "GET /v1",
                "GET /v1/models",
                "POST /v1/chat/completions",
                "POST /v1/messages",
            ],
        })),
    )
}
