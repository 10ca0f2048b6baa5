use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::ServiceError;
use crate::pipeline::{self, EndpointSection, FinancialDataPipeline, ResultBundle};
use crate::summarizer::Summarizer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FinancialDataPipeline>,
    pub summarizer: Arc<Summarizer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .route("/available-endpoints", get(available_endpoints))
        .route("/analyze", post(analyze))
        .route("/api/chat", post(chat))
        .route("/stock/{ticker}", get(stock))
        .route("/api/summarize", post(summarize))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Transport-side rendering of `ServiceError`: every failure becomes a
/// JSON body with an `error` field and a matching status code.
struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Detection => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Oracle(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Financial Data API is running" }))
}

async fn available_endpoints() -> Json<Value> {
    Json(json!({ "endpoints": pipeline::list_available_endpoints() }))
}

#[derive(serde::Deserialize)]
struct AnalyzeReq {
    question: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<ResultBundle>, ApiError> {
    let question = body
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or(ServiceError::Validation("question"))?;
    let bundle = state.pipeline.process_question(&question).await?;
    Ok(Json(bundle))
}

#[derive(serde::Deserialize)]
struct ChatReq {
    // The chat widget sends `message`; older clients send `question`.
    message: Option<String>,
    question: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatReq>,
) -> Result<Json<ResultBundle>, ApiError> {
    let question = body
        .message
        .or(body.question)
        .filter(|q| !q.trim().is_empty())
        .ok_or(ServiceError::Validation("message"))?;
    let bundle = state.pipeline.process_question(&question).await?;
    Ok(Json(bundle))
}

async fn stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IndexMap<String, EndpointSection>> {
    let requested: Option<Vec<String>> = params
        .get("endpoints")
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        });
    let results = state
        .pipeline
        .fetch_for_ticker(&ticker, requested.as_deref())
        .await;
    Json(results)
}

#[derive(serde::Deserialize)]
struct SummarizeReq {
    original_question: Option<String>,
    visualization_summaries: Option<Value>,
    // Accepted for compatibility with the frontend payload; the summary
    // prompt only embeds the summaries.
    #[serde(rename = "visualization_data")]
    _visualization_data: Option<Value>,
}

async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<SummarizeReq>,
) -> Result<Json<Value>, ApiError> {
    let question = body
        .original_question
        .filter(|q| !q.trim().is_empty())
        .ok_or(ServiceError::Validation("original_question"))?;
    let summaries = body
        .visualization_summaries
        .ok_or(ServiceError::Validation("visualization_summaries"))?;

    let summary = state.summarizer.summarize(&question, &summaries).await?;
    Ok(Json(json!({ "summary": summary })))
}
