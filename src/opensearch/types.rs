//! Shared types used by the OpenSearch client and query builders.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned while interacting with the index store.
#[derive(Debug, Error)]
pub enum OpenSearchError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid OpenSearch URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// OpenSearch responded with an unexpected status code.
    #[error("Unexpected OpenSearch response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from OpenSearch.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The requested document id does not exist in the index.
    #[error("Document '{0}' not found")]
    DocumentNotFound(String),
    /// A successful response was missing fields the client relies on.
    #[error("Malformed OpenSearch response: {0}")]
    MalformedResponse(String),
}

/// Document handed to the store for persistence. The vector is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    /// Document title, matched lexically with a boost.
    pub title: String,
    /// Document body.
    pub text: String,
    /// Dense embedding of `text`.
    pub vector: Vec<f32>,
}

/// Document as read back from the store, without its vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Identifier assigned by the store on write.
    pub id: String,
    /// Stored title.
    pub title: String,
    /// Stored body text.
    pub text: String,
}

/// Scored hit returned by a hybrid query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHit {
    /// Identifier assigned by the store.
    pub id: String,
    /// Blended relevance score computed by the store.
    pub score: f32,
    /// Stored title.
    pub title: String,
    /// Stored body text.
    pub text: String,
}

/// One page of hybrid query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitPage {
    /// Hits in descending score order.
    pub hits: Vec<StoredHit>,
    /// Total number of matches, independent of the page window.
    pub total: u64,
}

/// Combined lexical and vector query evaluated by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    /// Raw query text matched against `title` and `text`.
    pub text: String,
    /// Embedding of `text` matched against `vector`.
    pub vector: Vec<f32>,
    /// Nearest-neighbour candidates contributed by the vector clause.
    pub k: usize,
    /// Weight of title matches relative to body matches.
    pub title_boost: f32,
}

/// Index-level settings applied when the document index is created.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSettings {
    /// Vector dimension shared by every document.
    pub dimension: usize,
    /// Distance metric for the k-NN field.
    pub space_type: String,
    /// Candidate list size used at query time.
    pub ef_search: u32,
    /// Candidate list size used while building the HNSW graph.
    pub ef_construction: u32,
    /// Links per node in the HNSW graph.
    pub m: u32,
    /// Primary shard count.
    pub shards: u32,
    /// Replica count.
    pub replicas: u32,
}

impl IndexSettings {
    /// Settings for a single-node deployment storing vectors of `dimension` entries.
    pub fn for_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            space_type: "l2".into(),
            ef_search: 100,
            ef_construction: 128,
            m: 16,
            shards: 1,
            replicas: 0,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct WriteResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct GetResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) found: bool,
    #[serde(rename = "_source", default)]
    pub(crate) source: Option<SourceFields>,
}

#[derive(Deserialize, Default)]
pub(crate) struct SourceFields {
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) text: String,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    pub(crate) hits: SearchHits,
}

#[derive(Deserialize)]
pub(crate) struct SearchHits {
    pub(crate) total: TotalHits,
    #[serde(default)]
    pub(crate) hits: Vec<RawHit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

impl TotalHits {
    pub(crate) fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } => *value,
            TotalHits::Count(value) => *value,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RawHit {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    #[serde(rename = "_score", default)]
    pub(crate) score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub(crate) source: Option<SourceFields>,
}
