//! Reply pipeline shared by the web and ManyChat routes:
//! validate → quick reply → LLM completion → truncate.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::chat::prompts::system_prompt;
use crate::chat::quick_replies::quick_reply;
use crate::llm_client::{ChatCompletion, LlmError};

/// Upper bound on reply length, in characters, for both response shapes.
pub const MAX_REPLY_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplySource {
    Quick,
    Model,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

/// Every way a chat turn can fail. Each maps to a fixed apology for the user.
#[derive(Debug, Error)]
pub enum ChatFailure {
    #[error("empty message")]
    EmptyMessage,

    #[error("upstream busy: {0}")]
    Busy(LlmError),

    #[error("upstream failure: {0}")]
    Upstream(LlmError),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<LlmError> for ChatFailure {
    fn from(e: LlmError) -> Self {
        if e.is_timeout() {
            return ChatFailure::Busy(e);
        }
        match e {
            LlmError::Http(_) | LlmError::Api { .. } | LlmError::RetriesExhausted { .. } => {
                ChatFailure::Upstream(e)
            }
            other => ChatFailure::Unexpected(other.to_string()),
        }
    }
}

impl ChatFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatFailure::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatFailure::Busy(_) => StatusCode::REQUEST_TIMEOUT,
            ChatFailure::Upstream(_) | ChatFailure::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The user-facing apology for this failure.
    pub fn apology(&self, whatsapp_url: &str) -> String {
        match self {
            ChatFailure::EmptyMessage => "🔍 Por favor envía un mensaje válido.".to_string(),
            ChatFailure::Busy(_) => format!(
                "⏳ El servicio está ocupado. Intenta más tarde o contáctanos por WhatsApp: {whatsapp_url}"
            ),
            ChatFailure::Upstream(_) => format!(
                "🔴 No pudimos procesar tu solicitud. Escríbenos por WhatsApp: {whatsapp_url}"
            ),
            ChatFailure::Unexpected(_) => format!(
                "⚠️ Ocurrió un error inesperado. Puedes escribirnos por WhatsApp: {whatsapp_url}"
            ),
        }
    }
}

/// Answers one user message. Cheap to clone; shared through `AppState`.
#[derive(Clone)]
pub struct ChatReplier {
    llm: Arc<dyn ChatCompletion>,
    system_prompt: Arc<str>,
    whatsapp_url: Arc<str>,
}

impl ChatReplier {
    pub fn new(llm: Arc<dyn ChatCompletion>, whatsapp_url: &str) -> Self {
        Self {
            llm,
            system_prompt: system_prompt(whatsapp_url).into(),
            whatsapp_url: whatsapp_url.into(),
        }
    }

    pub fn whatsapp_url(&self) -> &str {
        &self.whatsapp_url
    }

    pub fn llm(&self) -> &dyn ChatCompletion {
        self.llm.as_ref()
    }

    pub async fn reply(&self, message: &str) -> Result<Reply, ChatFailure> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatFailure::EmptyMessage);
        }

        if let Some(text) = quick_reply(message, &self.whatsapp_url) {
            info!("Answered from quick replies");
            return Ok(Reply {
                text,
                source: ReplySource::Quick,
            });
        }

        let text = self
            .llm
            .complete(&self.system_prompt, message)
            .await
            .map_err(|e| {
                let failure = ChatFailure::from(e);
                error!("Chat completion failed: {failure}");
                failure
            })?;

        let total_chars = text.chars().count();
        if total_chars > MAX_REPLY_CHARS {
            warn!(total_chars, "Model reply truncated to {MAX_REPLY_CHARS} chars");
        }

        Ok(Reply {
            text: truncate_chars(&text, MAX_REPLY_CHARS).to_string(),
            source: ReplySource::Model,
        })
    }
}

/// Cuts `text` to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
