//! Data contracts and error taxonomy for the document pipeline.

use crate::{
    embedding::EmbeddingClientError, opensearch::OpenSearchError,
    summarization::SummarizationClientError,
};
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Document as exposed to API consumers. The stored vector is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Identifier assigned by the index store.
    pub id: String,
    /// Document title.
    pub title: String,
    /// Document body.
    pub text: String,
}

/// Ranked page of documents plus the full match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Documents in the store's relevance order.
    pub list_document: Vec<Document>,
    /// Number of matches across all pages.
    pub total: u64,
}

/// External collaborator a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Embedding gateway.
    Embedding,
    /// Document index store.
    IndexStore,
    /// LLM gateway.
    Llm,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Upstream::Embedding => "embedding service",
            Upstream::IndexStore => "index store",
            Upstream::Llm => "LLM service",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by search, summarize, and index operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Request parameters were outside the accepted bounds.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A referenced document id does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// An external collaborator failed, timed out, or returned malformed data.
    #[error("{upstream} unavailable: {message}")]
    UpstreamUnavailable {
        /// Collaborator that failed.
        upstream: Upstream,
        /// Failure detail from the collaborator.
        message: String,
    },
}

impl DocumentError {
    /// Shorthand for an [`DocumentError::UpstreamUnavailable`] failure.
    pub fn upstream(upstream: Upstream, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            upstream,
            message: message.into(),
        }
    }

    /// Whether another attempt at the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
        }
    }
}

impl From<OpenSearchError> for DocumentError {
    fn from(error: OpenSearchError) -> Self {
        match error {
            OpenSearchError::DocumentNotFound(id) => Self::NotFound(id),
            OpenSearchError::UnexpectedStatus { status, body } if is_rejection(status) => {
                Self::InvalidArgument(format!("index store rejected the request ({status}): {body}"))
            }
            other => Self::upstream(Upstream::IndexStore, other.to_string()),
        }
    }
}

/// 4xx answers that repeat on retry. A 404 here means a missing index, 408 and 429 are transient.
fn is_rejection(status: StatusCode) -> bool {
    status.is_client_error()
        && !matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
        )
}

impl From<EmbeddingClientError> for DocumentError {
    fn from(error: EmbeddingClientError) -> Self {
        Self::upstream(Upstream::Embedding, error.to_string())
    }
}

impl From<SummarizationClientError> for DocumentError {
    fn from(error: SummarizationClientError) -> Self {
        Self::upstream(Upstream::Llm, error.to_string())
    }
}
