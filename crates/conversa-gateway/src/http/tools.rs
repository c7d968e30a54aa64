use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::error::ApiError;

/// GET /api/tools — the registered tool catalog.
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tools: Vec<Value> = state
        .invoker
        .registry()
        .list()
        .into_iter()
        .map(|tool| {
            json!({
                "id": tool.id(),
                "name": tool.name(),
                "category": tool.category(),
                "description": tool.description(),
                "parameter_schema": tool.parameter_schema(),
            })
        })
        .collect();
    Json(json!({ "tools": tools }))
}

/// GET /api/tools/categories
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "categories": state.invoker.registry().categories() }))
}

#[derive(Debug, Deserialize)]
pub struct InvokeToolBody {
    pub dialogue_id: String,
    pub tool_id: String,
    #[serde(default)]
    pub parameters: Value,
}

/// POST /api/tools — invoke a tool out-of-band, e.g. for a client that wants
/// a direct result without running it through the Turn pipeline.
pub async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InvokeToolBody>,
) -> Result<Json<Value>, ApiError> {
    let invocation = state
        .invoker
        .invoke(&body.dialogue_id, &body.tool_id, body.parameters)
        .await?;
    Ok(Json(json!({
        "content": invocation.result.content,
        "is_error": invocation.result.is_error,
        "latency_ms": invocation.latency_ms,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ConversaConfig;
    use conversa_store::Store;

    fn state() -> Arc<AppState> {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        Arc::new(AppState::new(config, store))
    }

    #[tokio::test]
    async fn list_tools_includes_the_three_builtins() {
        let Json(body) = list_tools(axum::extract::State(state())).await;
        let ids: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"weather"));
        assert!(ids.contains(&"search"));
        assert!(ids.contains(&"calculator"));
    }

    #[tokio::test]
    async fn invoke_tool_runs_the_calculator() {
        let body = InvokeToolBody {
            dialogue_id: "d1".to_string(),
            tool_id: "calculator".to_string(),
            parameters: json!({"a": 2, "op": "+", "b": 3}),
        };
        let Json(result) = invoke_tool(axum::extract::State(state()), Json(body)).await.unwrap();
        assert_eq!(result["is_error"], json!(false));
    }

    #[tokio::test]
    async fn invoke_tool_rejects_an_unknown_tool_id() {
        let body = InvokeToolBody {
            dialogue_id: "d1".to_string(),
            tool_id: "not_a_tool".to_string(),
            parameters: json!({}),
        };
        let err = invoke_tool(axum::extract::State(state()), Json(body)).await.unwrap_err();
        assert_eq!(err.0.status_code() / 100, 4);
    }
}
