//! Chat message API handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Whether the text was a bot command.
    pub handled: bool,
    /// One entry per outbound chat message.
    pub messages: Vec<String>,
}

/// POST /api/v1/messages
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Json<MessageResponse> {
    let reply = state.chat().respond(&request.text).await;
    Json(MessageResponse {
        handled: reply.is_some(),
        messages: reply.unwrap_or_default(),
    })
}
