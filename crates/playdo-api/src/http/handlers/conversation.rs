//! Conversation HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/v1/conversations                   - List conversation summaries
//! - POST /api/v1/conversations                   - Create an empty conversation
//! - GET  /api/v1/conversations/{id}              - Get a conversation with messages
//! - POST /api/v1/conversations/{id}/send_message - Run one tutor turn

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use playdo_core::conversation::service::SendMessage;
use playdo_types::conversation::{Conversation, ConversationId, ConversationSummary};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for `send_message`.
///
/// Missing and `null` context fields both mean "not provided"; an empty
/// string is kept as an empty string.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default)]
    pub editor_code: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

impl From<SendMessageRequest> for SendMessage {
    fn from(req: SendMessageRequest) -> Self {
        SendMessage {
            message: req.message,
            editor_code: req.editor_code,
            stdout: req.stdout,
            stderr: req.stderr,
        }
    }
}

/// Parse a conversation id from a path parameter, returning a 400 error on invalid format.
fn parse_conversation_id(s: &str) -> Result<ConversationId, AppError> {
    s.parse::<ConversationId>()
        .map_err(|_| AppError::Validation(format!("Invalid conversation id: {s}")))
}

fn conversation_path(id: &ConversationId) -> String {
    format!("/api/v1/conversations/{id}")
}

/// GET /api/v1/conversations - List conversation summaries, most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<ConversationSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversations = state.tutor_service.list_conversations().await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(conversations, request_id, elapsed)
        .with_link("self", "/api/v1/conversations");

    Ok(Json(resp))
}

/// POST /api/v1/conversations - Create an empty conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<Conversation>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversation = state.tutor_service.create_conversation().await?;
    let path = conversation_path(&conversation.id);

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(conversation, request_id, elapsed)
        .with_link("self", &path)
        .with_link("send_message", &format!("{path}/send_message"));

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/conversations/{id} - Get a conversation with its messages.
pub async fn get_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let id = parse_conversation_id(&id)?;
    let conversation = state
        .tutor_service
        .get_conversation(&id)
        .await?
        .ok_or_else(|| AppError::ConversationNotFound(format!("Conversation {id} not found")))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(conversation, request_id, elapsed)
        .with_link("self", &conversation_path(&id));

    Ok(Json(resp))
}

/// POST /api/v1/conversations/{id}/send_message - Run one tutor turn.
///
/// Returns the full updated conversation. On upstream failure the user
/// message stays saved and the error says so.
pub async fn send_message(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let id = parse_conversation_id(&id)?;
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    if !state.upstream_configured {
        return Err(AppError::UpstreamNotConfigured(
            "ANTHROPIC_API_KEY is not set on the server".to_string(),
        ));
    }

    let conversation = state.tutor_service.send_message(&id, body.into()).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    tracing::debug!(
        request_id = %request_id,
        conversation_id = %id,
        elapsed_ms = elapsed,
        "send_message handled"
    );

    let resp = ApiResponse::success(conversation, request_id, elapsed)
        .with_link("self", &conversation_path(&id));

    Ok(Json(resp))
}
