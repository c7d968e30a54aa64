use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use conversa_core::error::ConversaError;
use conversa_core::types::DialogueId;
use conversa_orchestrator::NewDialogue;
use conversa_store::query::{DialogueFilter, Page, Pagination};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::http::error::ApiError;

/// Body shared by `POST /api/dialogues/new` and the per-type creator routes.
/// `dialogue_type` is only read by the former — the latter takes it from
/// the path instead.
#[derive(Debug, Deserialize)]
pub struct CreateDialogueBody {
    #[serde(default)]
    pub dialogue_type: Option<String>,
    pub human_id: Option<String>,
    pub ai_id: Option<String>,
    pub relation_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

fn to_new_dialogue(dialogue_type: &str, body: CreateDialogueBody) -> Result<NewDialogue, ApiError> {
    let dialogue_type = dialogue_type
        .parse()
        .map_err(|e| ApiError(ConversaError::InvalidParameters(format!("{e}"))))?;
    Ok(NewDialogue {
        dialogue_type,
        human_id: body.human_id,
        ai_id: body.ai_id,
        relation_id: body.relation_id,
        title: body.title,
        description: body.description,
        metadata: body.metadata,
    })
}

/// POST /api/dialogues/new — `dialogue_type` carried in the request body.
pub async fn create_dialogue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDialogueBody>,
) -> Result<Json<conversa_core::entities::Dialogue>, ApiError> {
    let dialogue_type = body.dialogue_type.clone().ok_or_else(|| {
        ApiError(ConversaError::InvalidParameters(
            "dialogue_type is required".to_string(),
        ))
    })?;
    let params = to_new_dialogue(&dialogue_type, body)?;
    let dialogue = state.dialogues.create_dialogue(params)?;
    Ok(Json(dialogue))
}

/// POST /api/dialogues/{dialogue_type} — one route per topology, e.g.
/// `/api/dialogues/human_ai`.
pub async fn create_typed_dialogue(
    State(state): State<Arc<AppState>>,
    Path(dialogue_type): Path<String>,
    Json(body): Json<CreateDialogueBody>,
) -> Result<Json<conversa_core::entities::Dialogue>, ApiError> {
    let params = to_new_dialogue(&dialogue_type, body)?;
    let dialogue = state.dialogues.create_dialogue(params)?;
    Ok(Json(dialogue))
}

/// GET /api/dialogues[?dialogue_type=&human_id=&ai_id=&is_active=&page=&page_size=]
pub async fn list_dialogues(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DialogueFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<conversa_core::entities::Dialogue>>, ApiError> {
    let page = state
        .store
        .list_dialogues(&filter, &pagination)
        .map_err(ConversaError::from)?;
    Ok(Json(page))
}

/// GET /api/dialogues/{id}
pub async fn get_dialogue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<conversa_core::entities::Dialogue>, ApiError> {
    let dialogue = state
        .store
        .get_dialogue(&DialogueId::from(id))
        .map_err(ConversaError::from)?;
    Ok(Json(dialogue))
}

/// POST /api/dialogues/{id}/close
pub async fn close_dialogue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let dialogue_id = DialogueId::from(id);
    state.dialogues.close_dialogue(&dialogue_id).await?;
    Ok(Json(serde_json::json!({"closed": true})))
}
