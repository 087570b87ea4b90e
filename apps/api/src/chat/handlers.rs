//! Axum route handlers for the chat API.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::chat::models::{ChatRequest, ManyChatReply, WebReply};
use crate::chat::reply::{ChatFailure, Reply};
use crate::state::AppState;

async fn answer(state: &AppState, body: &[u8]) -> Result<Reply, ChatFailure> {
    // Any Content-Type is accepted; the body is read as JSON regardless.
    let request: ChatRequest = serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected chat body: {e}");
        ChatFailure::Unexpected(e.to_string())
    })?;
    let reply = state.replier.reply(request.text()).await?;
    debug!(source = ?reply.source, chars = reply.text.chars().count(), "Chat reply ready");
    Ok(reply)
}

/// POST /api/chat
///
/// Web chat UI route. Failures keep the `{"response": ...}` shape and carry
/// the failure's status code so the page can style them.
pub async fn handle_web_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<WebReply>) {
    match answer(&state, &body).await {
        Ok(reply) => (StatusCode::OK, Json(WebReply { response: reply.text })),
        Err(failure) => (
            failure.status(),
            Json(WebReply {
                response: failure.apology(state.replier.whatsapp_url()),
            }),
        ),
    }
}

/// POST /webhook/manychat
///
/// ManyChat external-request route. Always 200: the platform drops non-2xx
/// bodies, so apologies travel in the same dynamic-block shape as replies.
pub async fn handle_manychat(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<ManyChatReply> {
    let whatsapp_url = state.replier.whatsapp_url();
    let text = match answer(&state, &body).await {
        Ok(reply) => reply.text,
        Err(failure) => failure.apology(whatsapp_url),
    };
    Json(ManyChatReply::text_with_whatsapp(text, whatsapp_url))
}
