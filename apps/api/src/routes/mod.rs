pub mod health;
pub mod page;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(page::chat_page_handler))
        .route("/health", get(health::health_handler))
        .route("/health/upstream", get(health::upstream_handler))
        .route("/keep-alive", get(health::keep_alive_handler))
        // Chat API
        .route("/api/chat", post(handlers::handle_web_chat))
        .route("/webhook/manychat", post(handlers::handle_manychat))
        .nest_service("/static", static_files)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use minijinja::{path_loader, Environment};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::chat::reply::{ChatReplier, MAX_REPLY_CHARS};
    use crate::config::Config;
    use crate::llm_client::testing::{Scripted, StubCompletion};

    const WA: &str = "https://w.app/test";

    fn test_state(stub: Arc<StubCompletion>) -> AppState {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let mut config = Config::from_lookup(|key| match key {
            "API_KEY" => Some("sk-test".to_string()),
            "WHATSAPP_URL" => Some(WA.to_string()),
            _ => None,
        })
        .unwrap();
        config.templates_dir = format!("{manifest_dir}/templates");
        config.static_dir = format!("{manifest_dir}/static");

        let mut env = Environment::new();
        env.set_loader(path_loader(config.templates_dir.clone()));

        AppState {
            replier: ChatReplier::new(stub, &config.whatsapp_url),
            config,
            templates: Arc::new(env),
        }
    }

    fn app(stub: Arc<StubCompletion>) -> Router {
        build_router(test_state(stub))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_web_chat_returns_model_reply() {
        let stub = Arc::new(StubCompletion::replying("Tenemos pijamas desde $50,000 COP"));
        let res = app(stub.clone())
            .oneshot(post_json("/api/chat", r#"{"message":"precio pijama hombre"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            json!({ "response": "Tenemos pijamas desde $50,000 COP" })
        );
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_web_chat_accepts_json_without_json_content_type() {
        let content_types = [
            None,
            Some("text/plain"),
            Some("application/x-www-form-urlencoded"),
        ];
        for content_type in content_types {
            let stub = Arc::new(StubCompletion::replying("Desde $50,000 COP"));
            let res = app(stub.clone())
                .oneshot(post_raw(
                    "/api/chat",
                    content_type,
                    r#"{"message":"precio pijama"}"#,
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK, "content type {content_type:?}");
            assert_eq!(json_body(res).await["response"], "Desde $50,000 COP");
            assert_eq!(stub.calls.lock().unwrap()[0].1, "precio pijama");
        }
    }

    #[tokio::test]
    async fn test_web_chat_empty_body_is_unexpected() {
        let res = app(Arc::new(StubCompletion::replying("unused")))
            .oneshot(post_raw("/api/chat", None, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(res).await["response"]
            .as_str()
            .unwrap()
            .starts_with("⚠️"));
    }

    #[tokio::test]
    async fn test_web_chat_empty_message_is_400() {
        let res = app(Arc::new(StubCompletion::replying("unused")))
            .oneshot(post_json("/api/chat", r#"{"message":"   "}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res).await["response"],
            "🔍 Por favor envía un mensaje válido."
        );
    }

    #[tokio::test]
    async fn test_web_chat_missing_field_is_400() {
        let res = app(Arc::new(StubCompletion::replying("unused")))
            .oneshot(post_json("/api/chat", "{}"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_web_chat_malformed_json_is_unexpected() {
        let res = app(Arc::new(StubCompletion::replying("unused")))
            .oneshot(post_json("/api/chat", "{not json"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(res).await;
        let text = body["response"].as_str().unwrap();
        assert!(text.starts_with("⚠️"));
        assert!(text.contains(WA));
    }

    #[tokio::test]
    async fn test_web_chat_timeout_is_408() {
        let res = app(Arc::new(StubCompletion::new(Scripted::Timeout)))
            .oneshot(post_json("/api/chat", r#"{"message":"precio"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(json_body(res).await["response"]
            .as_str()
            .unwrap()
            .starts_with("⏳"));
    }

    #[tokio::test]
    async fn test_web_chat_truncates_long_reply() {
        let stub = Arc::new(StubCompletion::replying(&"a".repeat(4000)));
        let res = app(stub)
            .oneshot(post_json("/api/chat", r#"{"message":"precio"}"#))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(
            body["response"].as_str().unwrap().chars().count(),
            MAX_REPLY_CHARS
        );
    }

    #[tokio::test]
    async fn test_manychat_wraps_reply_in_dynamic_block() {
        let stub = Arc::new(StubCompletion::replying("Claro que sí"));
        let res = app(stub)
            .oneshot(post_json(
                "/webhook/manychat",
                r#"{"last_input_text":"precio pijama niño"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["version"], "v2");
        assert_eq!(body["content"]["messages"][0]["text"], "Claro que sí");
        assert_eq!(body["content"]["messages"][0]["buttons"][0]["url"], WA);
    }

    #[tokio::test]
    async fn test_manychat_accepts_message_and_last_input_text_together() {
        let stub = Arc::new(StubCompletion::replying("Claro que sí"));
        let res = app(stub.clone())
            .oneshot(post_json(
                "/webhook/manychat",
                r#"{"message":"precio","last_input_text":"precio"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["content"]["messages"][0]["text"], "Claro que sí");
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_manychat_failure_still_200_with_apology() {
        let res = app(Arc::new(StubCompletion::new(Scripted::Upstream)))
            .oneshot(post_json("/webhook/manychat", r#"{"message":"precio"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert!(body["content"]["messages"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("🔴"));
    }

    #[tokio::test]
    async fn test_quick_reply_served_without_llm() {
        let stub = Arc::new(StubCompletion::new(Scripted::Upstream));
        let res = app(stub.clone())
            .oneshot(post_json("/api/chat", r#"{"message":"¿Hacen envíos?"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(json_body(res).await["response"]
            .as_str()
            .unwrap()
            .contains("Cúcuta"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let res = app(Arc::new(StubCompletion::replying("")))
            .oneshot(get_req("/health"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["status"], "active");
        assert_eq!(body["service"], "Pijamas Shalom Bot");
    }

    #[tokio::test]
    async fn test_keep_alive_has_timestamp() {
        let res = app(Arc::new(StubCompletion::replying("")))
            .oneshot(get_req("/keep-alive"))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["status"], "keep-alive triggered");
        let ts = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn test_upstream_probe_reachable_and_not() {
        let res = app(Arc::new(StubCompletion::replying("")))
            .oneshot(get_req("/health/upstream"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["reachable"], true);

        let res = app(Arc::new(StubCompletion::replying("").unreachable()))
            .oneshot(get_req("/health/upstream"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(res).await["reachable"], false);
    }

    #[tokio::test]
    async fn test_chat_page_renders_whatsapp_link() {
        let res = app(Arc::new(StubCompletion::replying("")))
            .oneshot(get_req("/"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Pijamas Shalom"));
        // minijinja's HTML autoescape encodes '/' as &#x2f;
        assert!(html.contains(r#"href="https:&#x2f;&#x2f;w.app&#x2f;test""#));
    }

    #[tokio::test]
    async fn test_static_assets_served() {
        let res = app(Arc::new(StubCompletion::replying("")))
            .oneshot(get_req("/static/chat.js"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
