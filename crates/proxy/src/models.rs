//! Models listing handler: upstream catalogue union static fallback.

use crate::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Public catalogue the upstream entries are scraped from.
const CATALOG_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

/// Hard timeout on the catalogue fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a fetched list is reused.
const LIST_TTL: Duration = Duration::from_secs(300);

/// Models always advertised, with fixed creation stamps so sorting is
/// stable even when the catalogue is unreachable.
const STATIC_MODELS: &[(&str, u64)] = &[
    ("claude-opus-4-5", 1_763_942_400),
    ("claude-opus-4-5-thinking", 1_763_942_400),
    ("claude-sonnet-4-5", 1_758_585_600),
    ("claude-sonnet-4-5-thinking", 1_758_585_600),
    ("claude-haiku-4-5", 1_760_486_400),
    ("claude-3-7-sonnet-20250219", 1_740_000_000),
];

/// Handles `GET /v1/models`.
///
/// Returns the union of the static list and Claude entries from the public
/// catalogue, newest first. Fetch failures and timeouts silently fall back
/// to the static list; a successful fetch is cached briefly.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    if let Some((at, cached)) = state.models_cache.lock().unwrap().as_ref()
        && at.elapsed() < LIST_TTL
    {
        return Json(cached.clone());
    }

    let mut models: BTreeMap<String, u64> = STATIC_MODELS
        .iter()
        .map(|(id, created)| ((*id).to_string(), *created))
        .collect();

    match fetch_catalogue(&state).await {
        Ok(fetched) => {
            for id in fetched {
                models.entry(id).or_insert(0);
            }
        }
        Err(e) => tracing::debug!("model catalogue fetch failed, using fallback: {e}"),
    }

    let mut entries: Vec<(String, u64)> = models.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let list = json!({
        "object": "list",
        "data": entries
            .into_iter()
            .map(|(id, created)| json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": "anthropic",
            }))
            .collect::<Vec<Value>>(),
    });

    *state.models_cache.lock().unwrap() = Some((Instant::now(), list.clone()));
    Json(list)
}

async fn fetch_catalogue(state: &AppState) -> Result<Vec<String>, String> {
    let resp = state
        .http
        .get(CATALOG_URL)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("catalogue returned {}", resp.status()));
    }
    let json: Value = resp.json().await.map_err(|e| e.to_string())?;
    let Some(map) = json.as_object() else {
        return Err("catalogue is not an object".to_string());
    };
    Ok(map
        .keys()
        .filter(|k| k.starts_with("claude-"))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_list_has_thinking_variants() {
        assert!(
            STATIC_MODELS
                .iter()
                .any(|(id, _)| id.ends_with("-thinking"))
        );
    }

    #[test]
    fn test_static_list_is_claude_only() {
        assert!(STATIC_MODELS.iter().all(|(id, _)| id.starts_with("claude-")));
    }
}
