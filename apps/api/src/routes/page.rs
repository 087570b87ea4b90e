use axum::{extract::State, response::Html};
use minijinja::context;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /
/// Renders the web chat UI.
pub async fn chat_page_handler(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let template = state.templates.get_template("chat.html")?;
    let html = template.render(context! {
        title => "Pijamas Shalom",
        whatsapp_url => state.config.whatsapp_url.as_str(),
    })?;
    Ok(Html(html))
}
