use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use stockroom_llm::LlmProvider;
use stockroom_rag::{GroundedAnswer, IndexStatus};

use super::error::ApiError;
use super::server::AppState;

#[derive(serde::Deserialize)]
pub(crate) struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(serde::Serialize)]
pub(crate) struct StatusResponse {
    embeddings_initialized: bool,
    item_count: usize,
    index: IndexStatus,
}

#[derive(serde::Serialize)]
pub(crate) struct RefreshResponse {
    message: &'static str,
    item_count: usize,
}

#[derive(serde::Serialize)]
pub(crate) struct EmbeddingsStatusResponse {
    loaded: bool,
    count: usize,
}

#[derive(serde::Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

pub(crate) async fn health_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub(crate) async fn status_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
) -> impl IntoResponse {
    let index = state.assistant.status();
    Json(StatusResponse {
        embeddings_initialized: index.is_ready(),
        item_count: index.item_count,
        index,
    })
}

pub(crate) async fn embeddings_status_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
) -> impl IntoResponse {
    let index = state.assistant.status();
    Json(EmbeddingsStatusResponse {
        loaded: index.is_ready(),
        count: index.item_count,
    })
}

pub(crate) async fn refresh_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let snapshot = state.assistant.refresh().await?;
    Ok(Json(RefreshResponse {
        message: "Embeddings refreshed successfully",
        item_count: snapshot.len(),
    }))
}

pub(crate) async fn query_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<GroundedAnswer>, ApiError> {
    let Json(request) = payload?;
    let answer = state.assistant.ask(&request.query, request.top_k).await?;
    Ok(Json(answer))
}
