use axum::Router;
use axum::routing::{get, post};
use stockroom_llm::LlmProvider;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    embeddings_status_handler, health_handler, query_handler, refresh_handler, status_handler,
};
use super::server::AppState;

pub(crate) fn build_router<P: LlmProvider + 'static>(state: AppState<P>, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler::<P>))
        .route("/status", get(status_handler::<P>))
        .route("/refresh-embeddings", post(refresh_handler::<P>))
        .route("/embeddings/status", get(embeddings_status_handler::<P>))
        .route("/embeddings/reload", post(refresh_handler::<P>))
        .route("/query", post(query_handler::<P>))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use stockroom_catalog::{CatalogRecord, InMemoryCatalog, TechnicalDetails};
    use stockroom_llm::mock::MockProvider;
    use stockroom_rag::{AssistantConfig, BuilderConfig, InventoryAssistant};
    use tower::ServiceExt;

    use super::*;

    const RESISTOR_TEXT: &str = "Category: resistor\nTechnical Details: 10k ohm";
    const CAPACITOR_TEXT: &str = "Category: capacitor\nTechnical Details: ceramic, 100nF";

    fn records() -> Vec<CatalogRecord> {
        let with_details = |id: i64, category: &str, description: &str| CatalogRecord {
            technical_details: TechnicalDetails {
                description: Some(description.into()),
                use_cases: Vec::new(),
            },
            ..CatalogRecord::new(id, category)
        };
        vec![
            with_details(1, "resistor", "10k ohm"),
            with_details(2, "capacitor", "ceramic, 100nF"),
        ]
    }

    fn provider() -> MockProvider {
        MockProvider::default()
            .with_embedding(RESISTOR_TEXT, vec![1.0, 0.0])
            .with_embedding(CAPACITOR_TEXT, vec![0.0, 1.0])
            .with_default_embedding(vec![0.7, 0.3])
    }

    fn make_router(provider: MockProvider, max_body_size: usize) -> Router {
        let assistant = InventoryAssistant::new(
            Arc::new(provider),
            Arc::new(InMemoryCatalog::new(records())),
            BuilderConfig::default(),
            AssistantConfig::default(),
        );
        let state = AppState {
            assistant: Arc::new(assistant),
            started_at: Instant::now(),
        };
        build_router(state, max_body_size)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = make_router(provider(), 1_048_576);
        let resp = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn status_before_refresh() {
        let app = make_router(provider(), 1_048_576);
        let resp = app.oneshot(get_req("/status")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["embeddings_initialized"], false);
        assert_eq!(json["item_count"], 0);
        assert_eq!(json["index"]["state"], "uninitialized");
    }

    #[tokio::test]
    async fn query_before_refresh_is_service_unavailable() {
        let app = make_router(provider(), 1_048_576);
        let resp = app
            .oneshot(post_json("/query", &serde_json::json!({"query": "10k resistor"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "not_ready");
    }

    #[tokio::test]
    async fn refresh_then_status_and_query() {
        let p = provider();
        p.push_response(
            r#"{"answer": "Use item 1.", "items": [{"item_id": 1, "relevance": "10k",
                "details": {"category": "resistor", "location": "", "technical_info": "10k ohm"}}]}"#,
        );
        let app = make_router(p, 1_048_576);

        let resp = app.clone().oneshot(post_empty("/refresh-embeddings")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["message"], "Embeddings refreshed successfully");
        assert_eq!(json["item_count"], 2);

        let resp = app.clone().oneshot(get_req("/embeddings/status")).await.unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["loaded"], true);
        assert_eq!(json["count"], 2);

        let resp = app.clone().oneshot(get_req("/status")).await.unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["embeddings_initialized"], true);
        assert_eq!(json["index"]["generation"], 1);

        let resp = app
            .oneshot(post_json(
                "/query",
                &serde_json::json!({"query": "10k resistor", "top_k": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["answer"], "Use item 1.");
        assert_eq!(json["items"][0]["record_id"], 1);
        assert_eq!(json["items"][0]["grounding"], "claimed");
    }

    #[tokio::test]
    async fn reload_is_an_alias_for_refresh() {
        let app = make_router(provider(), 1_048_576);
        let resp = app.clone().oneshot(post_empty("/embeddings/reload")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["item_count"], 2);
    }

    #[tokio::test]
    async fn refresh_failure_is_bad_gateway() {
        let app = make_router(MockProvider::failing(), 1_048_576);
        let resp = app.clone().oneshot(post_empty("/refresh-embeddings")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "upstream_service");

        let resp = app.oneshot(get_req("/embeddings/status")).await.unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["loaded"], false);
    }

    #[tokio::test]
    async fn missing_query_is_bad_request() {
        let app = make_router(provider(), 1_048_576);
        app.clone().oneshot(post_empty("/refresh-embeddings")).await.unwrap();

        let resp = app
            .oneshot(post_json("/query", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "validation");
        assert_eq!(json["message"], "No query provided");
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let app = make_router(provider(), 1_048_576);
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "validation");
    }

    #[tokio::test]
    async fn malformed_generation_is_bad_gateway() {
        let p = provider();
        p.push_response("not json at all");
        let app = make_router(p, 1_048_576);
        app.clone().oneshot(post_empty("/refresh-embeddings")).await.unwrap();

        let resp = app
            .oneshot(post_json("/query", &serde_json::json!({"query": "cap"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "malformed_response");
    }

    #[tokio::test]
    async fn concurrent_refresh_is_conflict() {
        let app = make_router(provider().with_delay(100), 1_048_576);

        let first = tokio::spawn(app.clone().oneshot(post_empty("/refresh-embeddings")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let resp = app.oneshot(post_empty("/refresh-embeddings")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "refresh_in_progress");

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn body_size_limit() {
        let app = make_router(provider(), 64);
        let oversized = vec![b'a'; 128];
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .header("content-length", "128")
            .body(Body::from(oversized))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = make_router(provider(), 1_048_576);
        let resp = app.oneshot(get_req("/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
