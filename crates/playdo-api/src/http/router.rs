//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation),
        )
        .route(
            "/conversations/{id}/send_message",
            post(handlers::conversation::send_message),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use playdo_core::llm::box_provider::BoxLlmProvider;
    use playdo_core::llm::provider::LlmProvider;
    use playdo_infra::sqlite::pool::DatabasePool;
    use playdo_types::config::PlaydoConfig;
    use playdo_types::conversation::ConversationId;
    use playdo_types::llm::UpstreamError;
    use playdo_types::message::Message;

    use crate::http::extractors::auth::ensure_api_key;

    /// Replies with a fixed text, or fails when `fail` is set.
    struct ScriptedProvider {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn reply(&self, _history: &[Message]) -> Result<Message, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(UpstreamError::Overloaded("try later".into()))
            } else {
                Ok(Message::assistant("What does line 1 print?"))
            }
        }
    }

    struct TestApp {
        router: Router,
        key: String,
        calls: Arc<AtomicUsize>,
    }

    async fn test_app_with(fail: bool, upstream_configured: bool) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let data_dir = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);

        let pool = DatabasePool::new(&url).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = BoxLlmProvider::new(ScriptedProvider {
            fail,
            calls: calls.clone(),
        });
        let state = AppState::new(
            pool,
            PlaydoConfig::default(),
            data_dir,
            provider,
            upstream_configured,
        );
        let key = ensure_api_key(&state).await.unwrap().unwrap();

        TestApp {
            router: build_router(state),
            key,
            calls,
        }
    }

    async fn test_app() -> TestApp {
        test_app_with(false, true).await
    }

    impl TestApp {
        async fn request(&self, method: &str, uri: &str, body: Option<&str>) -> Response {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {}", self.key));
            let body = match body {
                Some(body) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(body.to_string())
                }
                None => Body::empty(),
            };
            self.router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap()
        }

        async fn create_conversation(&self) -> String {
            let resp = self.request("POST", "/api/v1/conversations", None).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            body_json(resp).await["data"]["id"]
                .as_str()
                .unwrap()
                .to_string()
        }
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_key() {
        let app = test_app().await;
        let resp = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_or_wrong_key_is_401() {
        let app = test_app().await;

        let resp = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/v1/conversations")
                    .header("x-api-key", "playdo_wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_create_then_get_and_list() {
        let app = test_app().await;
        let id = app.create_conversation().await;

        let resp = app
            .request("GET", &format!("/api/v1/conversations/{id}"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["id"], id.as_str());
        assert_eq!(json["data"]["messages"], json!([]));

        let resp = app.request("GET", "/api/v1/conversations", None).await;
        let json = body_json(resp).await;
        assert_eq!(json["data"][0]["id"], id.as_str());
        assert_eq!(json["data"][0]["message_count"], 0);
    }

    #[tokio::test]
    async fn test_get_unknown_or_invalid_id() {
        let app = test_app().await;

        let unknown = ConversationId::new();
        let resp = app
            .request("GET", &format!("/api/v1/conversations/{unknown}"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await["errors"][0]["code"],
            "CONVERSATION_NOT_FOUND"
        );

        let resp = app
            .request("GET", "/api/v1/conversations/not-a-uuid", None)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_message_returns_full_conversation() {
        let app = test_app().await;
        let id = app.create_conversation().await;

        let body = json!({
            "message": "Why is nothing printed?",
            "editor_code": "x = 1",
            "stdout": "",
            "stderr": ""
        });
        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{id}/send_message"),
                Some(&body.to_string()),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let messages = json["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0]["sequence_number"], 0);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["editor_code"], "x = 1");
        assert_eq!(messages[0]["stdout"], "");
        assert_eq!(messages[0]["stderr"], "");

        assert_eq!(messages[1]["sequence_number"], 1);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"][0]["text"], "What does line 1 print?");
        assert_eq!(messages[1]["editor_code"], Value::Null);
    }

    #[tokio::test]
    async fn test_send_message_keeps_null_outputs_null() {
        let app = test_app().await;
        let id = app.create_conversation().await;

        let body = json!({ "message": "Is this right?", "editor_code": "print(1)", "stdout": null, "stderr": null });
        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{id}/send_message"),
                Some(&body.to_string()),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let user = &json["data"]["messages"][0];
        assert_eq!(user["stdout"], Value::Null);
        assert_eq!(user["stderr"], Value::Null);
    }

    #[tokio::test]
    async fn test_send_message_rejects_invalid_context() {
        let app = test_app().await;
        let id = app.create_conversation().await;

        let body = json!({ "message": "Hello", "stdout": "1\n", "stderr": "" });
        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{id}/send_message"),
                Some(&body.to_string()),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "VALIDATION_ERROR");
        assert_eq!(app.calls.load(Ordering::SeqCst), 0);

        let resp = app
            .request("GET", &format!("/api/v1/conversations/{id}"), None)
            .await;
        assert_eq!(body_json(resp).await["data"]["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_send_message_rejects_malformed_body() {
        let app = test_app().await;
        let id = app.create_conversation().await;
        let uri = format!("/api/v1/conversations/{id}/send_message");

        let resp = app.request("POST", &uri, Some(r#"{"editor_code": "x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app.request("POST", &uri, Some("{not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_user_message() {
        let app = test_app_with(true, true).await;
        let id = app.create_conversation().await;

        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{id}/send_message"),
                Some(r#"{"message": "Hello"}"#),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(resp).await;
        let error = &json["errors"][0];
        assert_eq!(error["code"], "UPSTREAM_ERROR");
        assert_eq!(error["details"]["user_message_saved"], true);
        assert_eq!(error["details"]["sequence_number"], 0);
        assert_eq!(json["data"], Value::Null);

        let resp = app
            .request("GET", &format!("/api/v1/conversations/{id}"), None)
            .await;
        let json = body_json(resp).await;
        let messages = json["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"][0]["text"], "Hello");
    }

    #[tokio::test]
    async fn test_send_message_to_unknown_conversation_is_404() {
        let app = test_app().await;
        let unknown = ConversationId::new();

        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{unknown}/send_message"),
                Some(r#"{"message": "Hello"}"#),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_upstream_is_503_and_saves_nothing() {
        let app = test_app_with(false, false).await;
        let id = app.create_conversation().await;

        let resp = app
            .request(
                "POST",
                &format!("/api/v1/conversations/{id}/send_message"),
                Some(r#"{"message": "Hello"}"#),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(resp).await["errors"][0]["code"],
            "UPSTREAM_NOT_CONFIGURED"
        );

        let resp = app
            .request("GET", &format!("/api/v1/conversations/{id}"), None)
            .await;
        assert_eq!(body_json(resp).await["data"]["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_ensure_api_key_only_generates_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("keys.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        let state = AppState::new(
            pool,
            PlaydoConfig::default(),
            dir.path().to_path_buf(),
            BoxLlmProvider::new(ScriptedProvider {
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            true,
        );

        assert!(ensure_api_key(&state).await.unwrap().is_some());
        assert!(ensure_api_key(&state).await.unwrap().is_none());
    }
}
