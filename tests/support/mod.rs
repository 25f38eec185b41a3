#![allow(dead_code)]

use async_trait::async_trait;
use docsearch::{
    config::Config,
    documents::{DocumentService, ServiceSettings, UpstreamPolicy},
    embedding::{EmbeddingClient, EmbeddingClientError, HashingEmbeddingClient},
    opensearch::{
        HitPage, HybridQuery, IndexSettings, IndexStore, NewDocument, OpenSearchError,
        StoredDocument, StoredHit,
    },
    summarization::{SummarizationClient, SummarizationClientError, SummarizationRequest},
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMENSION: usize = 16;

/// Index store kept in memory. Scores like a `bool.should` over k-NN, boosted title, and body.
#[derive(Default)]
pub struct InMemoryIndexStore {
    documents: Mutex<Vec<(String, NewDocument)>>,
    fetch_delays: Mutex<HashMap<String, Duration>>,
    write_delay: Option<Duration>,
    exists: AtomicBool,
    pub writes: AtomicUsize,
    pub gets: AtomicUsize,
    pub queries: AtomicUsize,
    pub creates: AtomicUsize,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self {
            exists: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn without_index() -> Self {
        Self::default()
    }

    /// Persist each write, then stall for `delay` before acknowledging it.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Insert a document directly, bypassing the service.
    pub async fn seed(&self, id: &str, title: &str, text: &str) {
        let vector = HashingEmbeddingClient::new(DIMENSION)
            .generate_embeddings(vec![text.to_string()])
            .await
            .unwrap()
            .pop()
            .unwrap();
        self.documents.lock().unwrap().push((
            id.to_string(),
            NewDocument {
                title: title.to_string(),
                text: text.to_string(),
                vector,
            },
        ));
    }

    /// Delay `get_document` for `id`, to shuffle completion order of concurrent fetches.
    pub fn delay_fetch(&self, id: &str, delay: Duration) {
        self.fetch_delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
    }

    pub fn backend_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
            + self.gets.load(Ordering::SeqCst)
            + self.queries.load(Ordering::SeqCst)
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn lexical_score(field: &str, query: &HashSet<String>) -> f32 {
    let field = tokens(field);
    query.iter().filter(|token| field.contains(*token)).count() as f32
}

fn l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn ping(&self) -> Result<(), OpenSearchError> {
        Ok(())
    }

    async fn index_exists(&self, _index: &str) -> Result<bool, OpenSearchError> {
        Ok(self.exists.load(Ordering::SeqCst))
    }

    async fn create_index(
        &self,
        _index: &str,
        _settings: &IndexSettings,
    ) -> Result<(), OpenSearchError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write_document(
        &self,
        _index: &str,
        document: NewDocument,
    ) -> Result<String, OpenSearchError> {
        let sequence = self.writes.fetch_add(1, Ordering::SeqCst);
        let id = format!("doc-{sequence}");
        self.documents
            .lock()
            .unwrap()
            .push((id.clone(), document));
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(id)
    }

    async fn get_document(&self, _index: &str, id: &str) -> Result<StoredDocument, OpenSearchError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delays.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|(stored_id, _)| stored_id == id)
            .map(|(stored_id, document)| StoredDocument {
                id: stored_id.clone(),
                title: document.title.clone(),
                text: document.text.clone(),
            })
            .ok_or_else(|| OpenSearchError::DocumentNotFound(id.to_string()))
    }

    async fn query(
        &self,
        _index: &str,
        query: &HybridQuery,
        offset: usize,
        limit: usize,
    ) -> Result<HitPage, OpenSearchError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.lock().unwrap();
        let query_tokens = tokens(&query.text);

        let mut by_distance: Vec<(usize, f32)> = documents
            .iter()
            .enumerate()
            .map(|(position, (_, document))| (position, l2(&document.vector, &query.vector)))
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let knn: HashMap<usize, f32> = by_distance
            .into_iter()
            .take(query.k)
            .map(|(position, distance)| (position, 1.0 / (1.0 + distance)))
            .collect();

        let mut scored: Vec<(usize, f32)> = documents
            .iter()
            .enumerate()
            .filter_map(|(position, (_, document))| {
                let lexical = query.title_boost * lexical_score(&document.title, &query_tokens)
                    + lexical_score(&document.text, &query_tokens);
                let vector = knn.get(&position).copied();
                if lexical == 0.0 && vector.is_none() {
                    return None;
                }
                Some((position, lexical + vector.unwrap_or(0.0)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let total = scored.len() as u64;
        let hits = scored
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(position, score)| {
                let (id, document) = &documents[position];
                StoredHit {
                    id: id.clone(),
                    score,
                    title: document.title.clone(),
                    text: document.text.clone(),
                }
            })
            .collect();

        Ok(HitPage { hits, total })
    }
}

/// Hashing embedder that counts how often it is called.
pub struct CountingEmbedder {
    inner: HashingEmbeddingClient,
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: HashingEmbeddingClient::new(DIMENSION),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_embeddings(texts).await
    }
}

/// LLM that records prompts and answers `summary-<n>` for the n-th call.
#[derive(Default)]
pub struct RecordingLlm {
    pub prompts: Mutex<Vec<String>>,
    failing_calls: Mutex<HashSet<usize>>,
}

impl RecordingLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given zero-based call numbers fail.
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            failing_calls: Mutex::new(calls.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummarizationClient for RecordingLlm {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt);
            prompts.len() - 1
        };
        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(SummarizationClientError::GenerationFailed(format!(
                "call {call} failed"
            )));
        }
        Ok(format!("summary-{call}"))
    }
}

/// Settings for tests: small vectors, no retries, no retry delay.
pub fn settings() -> ServiceSettings {
    let mut settings = ServiceSettings::from_config(&Config {
        embedding_dimension: DIMENSION,
        upstream_retries: 0,
        opensearch_startup_attempts: 1,
        opensearch_startup_delay_secs: 0,
        ..Config::default()
    });
    settings.upstream = settings.upstream.with_retry_delay(Duration::ZERO);
    settings.llm = settings.llm.with_retry_delay(Duration::ZERO);
    settings
}

pub fn with_retries(mut settings: ServiceSettings, retries: u32) -> ServiceSettings {
    settings.upstream = UpstreamPolicy {
        retries,
        ..settings.upstream
    };
    settings.llm = UpstreamPolicy {
        retries,
        ..settings.llm
    };
    settings
}

pub struct Harness {
    pub store: Arc<InMemoryIndexStore>,
    pub embedder: Arc<CountingEmbedder>,
    pub llm: Arc<RecordingLlm>,
    pub service: DocumentService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(InMemoryIndexStore::new(), RecordingLlm::new(), settings())
    }

    pub fn with(store: InMemoryIndexStore, llm: RecordingLlm, settings: ServiceSettings) -> Self {
        let store = Arc::new(store);
        let embedder = Arc::new(CountingEmbedder::new());
        let llm = Arc::new(llm);
        let service =
            DocumentService::from_parts(store.clone(), embedder.clone(), llm.clone(), settings);
        Self {
            store,
            embedder,
            llm,
            service,
        }
    }
}
