use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use conversa_core::ConversaConfig;
use conversa_llm::{LlmClient, MockLlmClient};
use conversa_notify::NotificationHub;
use conversa_orchestrator::{DialogueCore, IntrospectionEngine};
use conversa_store::Store;
use conversa_tools::{ToolInvoker, ToolRegistry};

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
///
/// `store` is the single source of truth; `dialogues` wraps it together with
/// the LLM client, tool invoker and notification hub to drive the
/// `processInput` pipeline. `introspection` is kept separate since it runs
/// against `ai_self` Dialogues outside the normal human-facing flow.
pub struct AppState {
    pub config: Arc<ConversaConfig>,
    pub store: Arc<Store>,
    pub dialogues: Arc<DialogueCore>,
    pub introspection: Arc<IntrospectionEngine>,
    pub invoker: Arc<ToolInvoker>,
    pub notify: Arc<NotificationHub>,
}

impl AppState {
    pub fn new(config: Arc<ConversaConfig>, store: Arc<Store>) -> Self {
        let notify = Arc::new(NotificationHub::new());
        let invoker = Arc::new(ToolInvoker::new(ToolRegistry::with_builtins()));

        // OpenAI/Azure providers need outbound HTTP credentials this
        // deployment doesn't wire up yet; mock keeps `processInput` usable
        // rather than failing every request at startup regardless of
        // `config.llm.provider`.
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new());

        let dialogues = Arc::new(DialogueCore::new(
            store.clone(),
            config.clone(),
            llm,
            invoker.clone(),
            notify.clone(),
        ));
        let introspection = Arc::new(IntrospectionEngine::new(store.clone(), invoker.clone()));

        Self {
            config,
            store,
            dialogues,
            introspection,
            invoker,
            notify,
        }
    }
}

fn cors_layer(origins: &[String]) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, CorsLayer};

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(parsed))
}

/// Assemble the full Axum router for the conversation orchestration surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api/input", post(crate::http::input::submit_input))
        .route(
            "/api/dialogues/new",
            post(crate::http::dialogues::create_dialogue),
        )
        .route(
            "/api/dialogues/{dialogue_type}",
            post(crate::http::dialogues::create_typed_dialogue),
        )
        .route("/api/dialogues", get(crate::http::dialogues::list_dialogues))
        .route(
            "/api/dialogues/{id}",
            get(crate::http::dialogues::get_dialogue),
        )
        .route(
            "/api/dialogues/{id}/close",
            post(crate::http::dialogues::close_dialogue),
        )
        .route(
            "/api/query/dialogues",
            get(crate::http::query::query_dialogues),
        )
        .route("/api/query/sessions", get(crate::http::query::query_sessions))
        .route("/api/query/turns", get(crate::http::query::query_turns))
        .route("/api/query/messages", get(crate::http::query::query_messages))
        .route(
            "/api/tools",
            get(crate::http::tools::list_tools).post(crate::http::tools::invoke_tool),
        )
        .route("/api/tools/categories", get(crate::http::tools::categories))
        .route(
            "/api/notify/{kind}",
            post(crate::http::notify::publish_notification),
        )
        .route(
            "/api/media/{*rest}",
            get(crate::http::stubs::not_implemented).post(crate::http::stubs::not_implemented),
        )
        .route("/api/auth/login", post(crate::http::stubs::not_implemented))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
}
