use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::session::CurrentPrincipal;
use crate::errors::{AppError, ValidationError};
use crate::faq::chat::{ChatMessage, ChatSession};
use crate::faq::knowledge_base::{QuickAction, KNOWLEDGE_BASE, QUICK_ACTIONS};
use crate::faq::matcher::answer;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FaqQuestion {
    pub id: u32,
    pub question: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FaqListResponse {
    pub questions: Vec<FaqQuestion>,
    pub quick_actions: &'static [QuickAction],
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub user: ChatMessage,
    pub assistant: ChatMessage,
}

/// GET /api/v1/faq
pub async fn handle_list_faq() -> Json<FaqListResponse> {
    Json(FaqListResponse {
        questions: KNOWLEDGE_BASE
            .iter()
            .map(|e| FaqQuestion {
                id: e.id,
                question: e.question,
            })
            .collect(),
        quick_actions: QUICK_ACTIONS,
    })
}

/// POST /api/v1/faq/answer
pub async fn handle_answer(Json(req): Json<AskRequest>) -> Result<Json<AskResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(ValidationError::MissingField("text").into());
    }
    Ok(Json(AskResponse {
        answer: answer(&req.text, KNOWLEDGE_BASE),
    }))
}

/// POST /api/v1/chat/sessions
pub async fn handle_open_chat(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> (StatusCode, Json<ChatSession>) {
    let session = state.chats.open(caller.principal.user_id).await;
    (StatusCode::CREATED, Json(session))
}

/// GET /api/v1/chat/sessions/:id
pub async fn handle_get_chat(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(state.chats.get(caller.principal.user_id, id).await?))
}

/// POST /api/v1/chat/sessions/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let (user, assistant) = state
        .chats
        .submit(caller.principal.user_id, id, &req.text)
        .await?;
    Ok(Json(ExchangeResponse { user, assistant }))
}

/// DELETE /api/v1/chat/sessions/:id
pub async fn handle_close_chat(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.chats.close(caller.principal.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
