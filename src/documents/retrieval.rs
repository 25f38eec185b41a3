//! Hybrid retrieval: embed the query, issue one blended lexical + k-NN query, map the page.

use crate::{
    config::Config,
    documents::{
        types::{Document, DocumentError, SearchResult, Upstream},
        upstream::UpstreamPolicy,
    },
    embedding::EmbeddingClient,
    opensearch::{HybridQuery, IndexStore, StoredHit},
};
use std::sync::Arc;

/// Query shape and paging bounds for the retrieval engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Nearest-neighbour candidates contributed by the vector clause.
    pub knn_k: usize,
    /// Weight of title matches relative to body matches.
    pub title_boost: f32,
    /// Largest accepted `limit`.
    pub max_limit: usize,
    /// Largest accepted `offset`.
    pub max_offset: usize,
    /// Largest accepted `offset + limit`; the store rejects deeper pages.
    pub max_result_window: usize,
    /// Vector length the embedding gateway must produce.
    pub embedding_dimension: usize,
}

impl SearchSettings {
    /// Derive search settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            knn_k: config.search_knn_k,
            title_boost: config.search_title_boost,
            max_limit: config.search_max_limit,
            max_offset: config.search_max_offset,
            max_result_window: config.search_max_result_window,
            embedding_dimension: config.embedding_dimension,
        }
    }
}

/// Ranks documents by the index store's blended lexical and vector score.
pub struct RetrievalEngine {
    store: Arc<dyn IndexStore>,
    embedder: Arc<dyn EmbeddingClient>,
    index: String,
    settings: SearchSettings,
    policy: UpstreamPolicy,
}

impl RetrievalEngine {
    /// Build an engine querying `index` through `store`.
    pub fn new(
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn EmbeddingClient>,
        index: impl Into<String>,
        settings: SearchSettings,
        policy: UpstreamPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            index: index.into(),
            settings,
            policy,
        }
    }

    /// Return the `[offset, offset + limit)` window of documents matching `query_text`.
    ///
    /// Empty query text is valid: it embeds to a degenerate vector and the k-NN clause still
    /// contributes candidates. Paging outside the configured bounds fails with
    /// [`DocumentError::InvalidArgument`] before any backend call.
    pub async fn search(
        &self,
        query_text: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResult, DocumentError> {
        self.validate_window(offset, limit)?;

        let vector = embed_text(
            self.embedder.as_ref(),
            &self.policy,
            query_text,
            self.settings.embedding_dimension,
        )
        .await?;

        let query = HybridQuery {
            text: query_text.to_string(),
            vector,
            k: self.settings.knn_k,
            title_boost: self.settings.title_boost,
        };

        let store = self.store.as_ref();
        let index = self.index.as_str();
        let query = &query;
        let page = self
            .policy
            .run(Upstream::IndexStore, move || {
                store.query(index, query, offset, limit)
            })
            .await?;

        tracing::debug!(
            index,
            offset,
            limit,
            returned = page.hits.len(),
            total = page.total,
            "Search completed"
        );

        Ok(SearchResult {
            list_document: page.hits.into_iter().map(map_hit).collect(),
            total: page.total,
        })
    }

    fn validate_window(&self, offset: usize, limit: usize) -> Result<(), DocumentError> {
        if limit == 0 || limit > self.settings.max_limit {
            return Err(DocumentError::InvalidArgument(format!(
                "limit must be between 1 and {}, got {limit}",
                self.settings.max_limit
            )));
        }
        if offset > self.settings.max_offset {
            return Err(DocumentError::InvalidArgument(format!(
                "offset must not exceed {}, got {offset}",
                self.settings.max_offset
            )));
        }
        if offset.saturating_add(limit) > self.settings.max_result_window {
            return Err(DocumentError::InvalidArgument(format!(
                "offset + limit must not exceed {}, got {}",
                self.settings.max_result_window,
                offset.saturating_add(limit)
            )));
        }
        Ok(())
    }
}

fn map_hit(hit: StoredHit) -> Document {
    let StoredHit {
        id, title, text, ..
    } = hit;
    Document { id, title, text }
}

/// Embed a single text under the upstream policy and check the vector length.
pub(crate) async fn embed_text(
    embedder: &dyn EmbeddingClient,
    policy: &UpstreamPolicy,
    text: &str,
    dimension: usize,
) -> Result<Vec<f32>, DocumentError> {
    let mut vectors = policy
        .run(Upstream::Embedding, move || {
            embedder.generate_embeddings(vec![text.to_string()])
        })
        .await?;

    let vector = vectors.pop().ok_or_else(|| {
        DocumentError::upstream(Upstream::Embedding, "provider returned no vectors")
    })?;

    if vector.len() != dimension {
        return Err(DocumentError::upstream(
            Upstream::Embedding,
            format!(
                "embedding dimension mismatch: expected {dimension}, got {}",
                vector.len()
            ),
        ));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingClient;
    use crate::opensearch::{
        HitPage, IndexSettings, NewDocument, OpenSearchError, StoredDocument,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedStore {
        page: HitPage,
        queries: Mutex<Vec<(HybridQuery, usize, usize)>>,
    }

    #[async_trait]
    impl IndexStore for ScriptedStore {
        async fn ping(&self) -> Result<(), OpenSearchError> {
            Ok(())
        }

        async fn index_exists(&self, _index: &str) -> Result<bool, OpenSearchError> {
            Ok(true)
        }

        async fn create_index(
            &self,
            _index: &str,
            _settings: &IndexSettings,
        ) -> Result<(), OpenSearchError> {
            Ok(())
        }

        async fn write_document(
            &self,
            _index: &str,
            _document: NewDocument,
        ) -> Result<String, OpenSearchError> {
            Ok("unused".into())
        }

        async fn get_document(
            &self,
            _index: &str,
            id: &str,
        ) -> Result<StoredDocument, OpenSearchError> {
            Err(OpenSearchError::DocumentNotFound(id.to_string()))
        }

        async fn query(
            &self,
            _index: &str,
            query: &HybridQuery,
            offset: usize,
            limit: usize,
        ) -> Result<HitPage, OpenSearchError> {
            self.queries
                .lock()
                .unwrap()
                .push((query.clone(), offset, limit));
            Ok(self.page.clone())
        }
    }

    fn settings() -> SearchSettings {
        SearchSettings::from_config(&Config {
            embedding_dimension: 8,
            ..Config::default()
        })
    }

    fn engine(store: Arc<ScriptedStore>) -> RetrievalEngine {
        RetrievalEngine::new(
            store,
            Arc::new(HashingEmbeddingClient::new(8)),
            "documents",
            settings(),
            UpstreamPolicy::new(Duration::from_secs(1), 0),
        )
    }

    #[tokio::test]
    async fn search_passes_window_and_maps_hits_in_order() {
        let store = Arc::new(ScriptedStore {
            page: HitPage {
                hits: vec![
                    StoredHit {
                        id: "b".into(),
                        score: 3.0,
                        title: "Beta".into(),
                        text: "second".into(),
                    },
                    StoredHit {
                        id: "a".into(),
                        score: 1.0,
                        title: "Alpha".into(),
                        text: "first".into(),
                    },
                ],
                total: 9,
            },
            ..Default::default()
        });

        let result = engine(store.clone())
            .search("greek letters", 5, 2)
            .await
            .expect("search");

        assert_eq!(result.total, 9);
        let ids: Vec<_> = result.list_document.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);

        let queries = store.queries.lock().unwrap();
        let (query, offset, limit) = &queries[0];
        assert_eq!((*offset, *limit), (5, 2));
        assert_eq!(query.k, 12);
        assert!((query.title_boost - 2.0).abs() < f32::EPSILON);
        assert_eq!(query.text, "greek letters");
        assert_eq!(query.vector.len(), 8);
    }

    #[tokio::test]
    async fn empty_query_is_not_an_error() {
        let store = Arc::new(ScriptedStore::default());
        let result = engine(store.clone()).search("", 0, 20).await.expect("search");

        assert!(result.list_document.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(store.queries.lock().unwrap()[0].0.vector, vec![0.0; 8]);
    }

    #[tokio::test]
    async fn out_of_bounds_window_fails_before_backend_calls() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine(store.clone());

        for (offset, limit) in [(0, 0), (0, 101), (10_001, 20)] {
            let error = engine
                .search("query", offset, limit)
                .await
                .expect_err("invalid window");
            assert!(matches!(error, DocumentError::InvalidArgument(_)));
        }
        assert!(store.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn window_may_end_exactly_at_result_window() {
        let store = Arc::new(ScriptedStore::default());
        let engine = engine(store.clone());

        engine
            .search("query", 9_900, 100)
            .await
            .expect("window ending at 10000");
        let error = engine
            .search("query", 9_950, 100)
            .await
            .expect_err("window past 10000");

        assert!(matches!(error, DocumentError::InvalidArgument(_)));
        assert_eq!(store.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_embedding_failure() {
        let store = Arc::new(ScriptedStore::default());
        let engine = RetrievalEngine::new(
            store.clone(),
            Arc::new(HashingEmbeddingClient::new(4)),
            "documents",
            settings(),
            UpstreamPolicy::new(Duration::from_secs(1), 0),
        );

        let error = engine.search("query", 0, 10).await.expect_err("mismatch");
        assert!(matches!(
            error,
            DocumentError::UpstreamUnavailable {
                upstream: Upstream::Embedding,
                ..
            }
        ));
        assert!(store.queries.lock().unwrap().is_empty());
    }
}
