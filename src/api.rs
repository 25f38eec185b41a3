//! HTTP surface for docsearch.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /search` – Hybrid search. Accepts `searchString` plus optional `offset` (default 0)
//!   and `limit` (default 20); returns `{ "listDocument": [...], "total": n }`.
//! - `POST /summarize` – Summarize up to 50 documents by id; returns `{ "summary": "..." }`.
//! - `POST /documents` – Embed and index a new document; returns `{ id, title, text }`.
//! - `GET /metrics` – Observe request counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Cross-origin requests are allowed from anywhere so browser front-ends can call the API
//! directly.

use crate::documents::{Document, DocumentApi, DocumentError, SearchResult};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Build the HTTP router exposing the search, summarize, and index operations.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/search", post(search::<S>))
        .route("/summarize", post(summarize::<S>))
        .route("/documents", post(index_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Request body for `POST /search`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    /// Free-text query matched lexically and semantically.
    search_string: String,
    /// Number of ranked results to skip.
    #[serde(default)]
    offset: usize,
    /// Page size.
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Run a hybrid search and return one page plus the total match count.
async fn search<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResult>, AppError>
where
    S: DocumentApi,
{
    let SearchRequest {
        search_string,
        offset,
        limit,
    } = request;
    let result = service.search(&search_string, offset, limit).await?;
    tracing::info!(
        offset,
        limit,
        returned = result.list_document.len(),
        total = result.total,
        "Search request completed"
    );
    Ok(Json(result))
}

/// Request body for `POST /summarize`.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Ids of the documents to summarize, in the order their text is concatenated.
    ids: Vec<String>,
}

/// Response body for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

/// Summarize the referenced documents.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: DocumentApi,
{
    let summary = service.summarize(&request.ids).await?;
    tracing::info!(
        documents = request.ids.len(),
        characters = summary.len(),
        "Summarize request completed"
    );
    Ok(Json(SummarizeResponse { summary }))
}

/// Request body for `POST /documents`.
#[derive(Deserialize)]
struct IndexRequest {
    title: String,
    text: String,
}

/// Embed and index a new document; it is searchable once this returns.
async fn index_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<Document>, AppError>
where
    S: DocumentApi,
{
    let document = service.index_document(request.title, request.text).await?;
    Ok(Json(document))
}

/// Return the current request counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Hybrid lexical and vector search. Titles weigh twice as much as body text. Response returns { \"listDocument\": [...], \"total\": number }.",
                request_example: Some(json!({
                    "searchString": "solar storms",
                    "offset": 0,
                    "limit": 20
                })),
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize up to 50 indexed documents with the configured LLM. Response returns { \"summary\": string }.",
                request_example: Some(json!({ "ids": ["doc-id-1", "doc-id-2"] })),
            },
            CommandDescriptor {
                name: "index_document",
                method: "POST",
                path: "/documents",
                description: "Embed and index a document. It is searchable as soon as the response arrives.",
                request_example: Some(json!({
                    "title": "Document title",
                    "text": "Document contents"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(DocumentError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DocumentError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DocumentError::NotFound(_) => StatusCode::NOT_FOUND,
            DocumentError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        let body = Json(json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<DocumentError> for AppError {
    fn from(inner: DocumentError) -> Self {
        Self(inner)
    }
}
