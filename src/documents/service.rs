//! Document service coordinating retrieval, summarization, and the embed-then-write path.

use crate::{
    config::{Config, get_config},
    documents::{
        retrieval::{RetrievalEngine, SearchSettings, embed_text},
        summarize::{SummarizationEngine, SummarizeSettings},
        types::{Document, DocumentError, SearchResult, Upstream},
        upstream::UpstreamPolicy,
    },
    embedding::{EmbeddingClient, get_embedding_client},
    metrics::{MetricsSnapshot, ServiceMetrics},
    opensearch::{IndexSettings, IndexStore, NewDocument, OpenSearchService},
    summarization::{SummarizationClient, get_summarization_client},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Everything the service needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Index holding the documents.
    pub index_name: String,
    /// Settings applied if the index has to be created.
    pub index: IndexSettings,
    /// Retrieval engine settings.
    pub search: SearchSettings,
    /// Summarization engine settings.
    pub summarize: SummarizeSettings,
    /// Policy for embedding and index store calls.
    pub upstream: UpstreamPolicy,
    /// Policy for LLM chat calls.
    pub llm: UpstreamPolicy,
    /// Pings attempted while waiting for the index store at startup.
    pub startup_attempts: u32,
    /// Pause between startup pings.
    pub startup_delay: Duration,
}

impl ServiceSettings {
    /// Derive service settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_name: config.opensearch_index_name.clone(),
            index: IndexSettings::for_dimension(config.embedding_dimension),
            search: SearchSettings::from_config(config),
            summarize: SummarizeSettings::from_config(config),
            upstream: UpstreamPolicy::new(
                Duration::from_secs(config.upstream_timeout_secs),
                config.upstream_retries,
            ),
            llm: UpstreamPolicy::new(
                Duration::from_secs(config.llm_timeout_secs),
                config.upstream_retries,
            ),
            startup_attempts: config.opensearch_startup_attempts.max(1),
            startup_delay: Duration::from_secs(config.opensearch_startup_delay_secs),
        }
    }
}

/// Abstraction over the document pipeline used by the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Hybrid search returning one page of documents and the total match count.
    async fn search(
        &self,
        query_text: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResult, DocumentError>;

    /// Summarize the referenced documents into one string.
    async fn summarize(&self, ids: &[String]) -> Result<String, DocumentError>;

    /// Embed and persist a new document, returning it with its assigned id.
    async fn index_document(
        &self,
        title: String,
        text: String,
    ) -> Result<Document, DocumentError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Owns the collaborators and both engines; construct once and share through an `Arc`.
pub struct DocumentService {
    store: Arc<dyn IndexStore>,
    embedder: Arc<dyn EmbeddingClient>,
    retrieval: RetrievalEngine,
    summarizer: SummarizationEngine,
    settings: ServiceSettings,
    metrics: ServiceMetrics,
}

impl DocumentService {
    /// Wire a service from explicit collaborators.
    pub fn from_parts(
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn EmbeddingClient>,
        llm: Arc<dyn SummarizationClient>,
        settings: ServiceSettings,
    ) -> Self {
        let retrieval = RetrievalEngine::new(
            store.clone(),
            embedder.clone(),
            settings.index_name.clone(),
            settings.search.clone(),
            settings.upstream,
        );
        let summarizer = SummarizationEngine::new(
            store.clone(),
            llm,
            settings.index_name.clone(),
            settings.summarize.clone(),
            settings.upstream,
            settings.llm,
        );

        Self {
            store,
            embedder,
            retrieval,
            summarizer,
            settings,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Build a service from the global configuration. No network calls are made.
    pub fn from_config() -> Result<Self, DocumentError> {
        let config = get_config();
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedder = get_embedding_client()?;
        let llm = get_summarization_client()?;
        let store = Arc::new(OpenSearchService::from_config()?);
        Ok(Self::from_parts(
            store,
            embedder,
            llm,
            ServiceSettings::from_config(config),
        ))
    }

    /// Wait for the index store to answer and create the document index when missing.
    pub async fn bootstrap(&self) -> Result<(), DocumentError> {
        self.wait_for_store().await?;
        let index = self.settings.index_name.as_str();
        if self.index_ready().await? {
            tracing::debug!(index, "Index already present");
            return Ok(());
        }

        let store = self.store.as_ref();
        let index_settings = &self.settings.index;
        self.settings
            .upstream
            .run(Upstream::IndexStore, move || {
                store.create_index(index, index_settings)
            })
            .await?;
        tracing::info!(index, dimension = index_settings.dimension, "Index ready");
        Ok(())
    }

    /// Report whether the document index exists.
    pub async fn index_ready(&self) -> Result<bool, DocumentError> {
        let store = self.store.as_ref();
        let index = self.settings.index_name.as_str();
        self.settings
            .upstream
            .run(Upstream::IndexStore, move || store.index_exists(index))
            .await
    }

    async fn wait_for_store(&self) -> Result<(), DocumentError> {
        let attempts = self.settings.startup_attempts;
        let timeout = self.settings.upstream.timeout;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(timeout, self.store.ping()).await {
                Ok(Ok(())) => {
                    tracing::debug!(attempt, "Index store reachable");
                    return Ok(());
                }
                Ok(Err(error)) => last_error = error.to_string(),
                Err(_) => last_error = format!("ping timed out after {}ms", timeout.as_millis()),
            }
            tracing::warn!(
                attempt,
                attempts,
                error = %last_error,
                "Index store not reachable yet"
            );
            if attempt < attempts {
                tokio::time::sleep(self.settings.startup_delay).await;
            }
        }

        Err(DocumentError::upstream(
            Upstream::IndexStore,
            format!("not reachable after {attempts} attempts: {last_error}"),
        ))
    }

    /// Hybrid search over the index.
    pub async fn search(
        &self,
        query_text: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResult, DocumentError> {
        let result = self.retrieval.search(query_text, offset, limit).await?;
        self.metrics.record_search();
        Ok(result)
    }

    /// Summarize the referenced documents.
    pub async fn summarize(&self, ids: &[String]) -> Result<String, DocumentError> {
        let outcome = self.summarizer.summarize(ids).await?;
        self.metrics.record_summary(outcome.chunk_count as u64);
        tracing::info!(
            documents = ids.len(),
            chunks = outcome.chunk_count,
            "Summary generated"
        );
        Ok(outcome.summary)
    }

    /// Embed `text`, write the document with immediate visibility, and return it.
    pub async fn index_document(
        &self,
        title: String,
        text: String,
    ) -> Result<Document, DocumentError> {
        let vector = embed_text(
            self.embedder.as_ref(),
            &self.settings.upstream,
            &text,
            self.settings.search.embedding_dimension,
        )
        .await?;

        let store = self.store.as_ref();
        let index = self.settings.index_name.as_str();
        let document = NewDocument {
            title: title.clone(),
            text: text.clone(),
            vector,
        };
        let document = &document;
        // The store assigns ids, so a retry after a slow but successful write would duplicate it.
        let id = self
            .settings
            .upstream
            .without_retries()
            .run(Upstream::IndexStore, move || {
                store.write_document(index, document.clone())
            })
            .await?;

        self.metrics.record_document();
        tracing::info!(index, id = %id, "Document indexed");
        Ok(Document { id, title, text })
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn search(
        &self,
        query_text: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResult, DocumentError> {
        DocumentService::search(self, query_text, offset, limit).await
    }

    async fn summarize(&self, ids: &[String]) -> Result<String, DocumentError> {
        DocumentService::summarize(self, ids).await
    }

    async fn index_document(
        &self,
        title: String,
        text: String,
    ) -> Result<Document, DocumentError> {
        DocumentService::index_document(self, title, text).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
