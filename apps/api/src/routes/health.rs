use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::llm_client::ProbeReport;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "active",
        "service": "Pijamas Shalom Bot",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /keep-alive
/// Pinged by an external scheduler so the free-tier host does not idle out.
pub async fn keep_alive_handler() -> Json<Value> {
    Json(json!({
        "status": "keep-alive triggered",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// GET /health/upstream
/// Runs the connectivity probe against the completion API.
pub async fn upstream_handler(State(state): State<AppState>) -> (StatusCode, Json<ProbeReport>) {
    let report = state.replier.llm().probe().await;
    let status = if report.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
