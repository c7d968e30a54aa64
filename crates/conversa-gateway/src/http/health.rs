use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llm_model": state.config.llm.model,
        "db_url": state.config.database.url,
        "tool_count": state.invoker.registry().list().len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ConversaConfig;
    use conversa_store::Store;

    #[tokio::test]
    async fn reports_ok_and_a_nonzero_tool_count() {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        let state = Arc::new(AppState::new(config, store));

        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["status"], json!("ok"));
        assert!(body["tool_count"].as_u64().unwrap() >= 3);
    }
}
