// Storefront chat: prompt, quick replies, the reply pipeline, and its two
// HTTP surfaces (web UI and ManyChat webhook).
// All LLM calls go through llm_client — no direct HTTP calls here.

pub mod handlers;
pub mod models;
pub mod prompts;
pub mod quick_replies;
pub mod reply;
