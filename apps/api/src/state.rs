use std::sync::Arc;

use minijinja::Environment;

use crate::chat::reply::ChatReplier;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub replier: ChatReplier,
    pub config: Config,
    /// Template environment for the chat page, loaded from `config.templates_dir`.
    pub templates: Arc<Environment<'static>>,
}
