//! OpenSearch index store integration.
//!
//! [`IndexStore`] is the seam the retrieval and summarization engines talk to; the HTTP
//! implementation lives in [`client`], and the request bodies it sends are built in [`query`].

pub mod client;
pub mod query;
pub mod types;

use async_trait::async_trait;

pub use client::{Credentials, OpenSearchService};
pub use types::{
    HitPage, HybridQuery, IndexSettings, NewDocument, OpenSearchError, StoredDocument, StoredHit,
};

/// Persistence and hybrid query operations backing the document pipeline.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Check that the cluster answers requests.
    async fn ping(&self) -> Result<(), OpenSearchError>;

    /// Report whether `index` exists.
    async fn index_exists(&self, index: &str) -> Result<bool, OpenSearchError>;

    /// Create `index` with k-NN settings and the document mapping.
    async fn create_index(&self, index: &str, settings: &IndexSettings)
    -> Result<(), OpenSearchError>;

    /// Persist a document and return the identifier the store assigned.
    ///
    /// The write must be visible to queries once this returns.
    async fn write_document(
        &self,
        index: &str,
        document: NewDocument,
    ) -> Result<String, OpenSearchError>;

    /// Fetch a document by id, failing with [`OpenSearchError::DocumentNotFound`] when absent.
    async fn get_document(&self, index: &str, id: &str) -> Result<StoredDocument, OpenSearchError>;

    /// Evaluate a hybrid query and return the requested window of the blended ranking.
    async fn query(
        &self,
        index: &str,
        query: &HybridQuery,
        offset: usize,
        limit: usize,
    ) -> Result<HitPage, OpenSearchError>;
}
