use serde::{Deserialize, Serialize};

/// Inbound chat message. ManyChat's external request can be configured to send
/// `message`, its built-in `last_input_text` field, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_input_text: Option<String>,
}

impl ChatRequest {
    /// `message`, or `last_input_text` when `message` is blank.
    pub fn text(&self) -> &str {
        if !self.message.trim().is_empty() {
            return &self.message;
        }
        self.last_input_text.as_deref().unwrap_or(&self.message)
    }
}

/// Response shape consumed by the bundled web chat page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebReply {
    pub response: String,
}

// ────────────────────────────────────────────────────────────────────────────
// ManyChat dynamic block (v2) — mirrors the platform's schema
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManyChatReply {
    pub version: String,
    pub content: ManyChatContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManyChatContent {
    pub messages: Vec<ManyChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManyChatMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ManyChatButton>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManyChatButton {
    #[serde(rename = "type")]
    pub kind: String,
    pub caption: String,
    pub url: String,
}

impl ManyChatReply {
    /// A single text message with a WhatsApp URL button under it.
    pub fn text_with_whatsapp(text: impl Into<String>, whatsapp_url: &str) -> Self {
        Self {
            version: "v2".to_string(),
            content: ManyChatContent {
                messages: vec![ManyChatMessage {
                    kind: "text".to_string(),
                    text: text.into(),
                    buttons: vec![ManyChatButton {
                        kind: "url".to_string(),
                        caption: "💬 WhatsApp".to_string(),
                        url: whatsapp_url.to_string(),
                    }],
                }],
            },
        }
    }
}
