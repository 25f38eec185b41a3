//! Multi-document summarization: fetch, concatenate, chunk, summarize per chunk, join.
//!
//! Chunking is purely character based. Boundaries fall at exact multiples of the chunk length
//! whether or not they split a word; only Unicode scalar values are kept whole.

use crate::{
    config::Config,
    documents::{
        types::{DocumentError, Upstream},
        upstream::UpstreamPolicy,
    },
    opensearch::IndexStore,
    summarization::{SummarizationClient, SummarizationRequest},
};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// Instruction prepended to every chunk sent to the LLM.
pub const SUMMARY_PROMPT_PREFIX: &str = "Summarize this text: ";

/// Limits and model selection for the summarization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeSettings {
    /// Largest number of ids one request may reference.
    pub max_documents: usize,
    /// Maximum chunk length in characters.
    pub chunk_chars: usize,
    /// Document fetches allowed in flight at once.
    pub fetch_concurrency: usize,
    /// Chat model used for chunk summaries.
    pub model: String,
}

impl SummarizeSettings {
    /// Derive summarization settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_documents: config.summarize_max_documents,
            chunk_chars: config.summarize_chunk_chars.max(1),
            fetch_concurrency: config.summarize_fetch_concurrency.max(1),
            model: config.summarization_model.clone(),
        }
    }
}

/// Outcome of a summarize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Chunk summaries joined with single spaces.
    pub summary: String,
    /// Number of chunks sent to the LLM.
    pub chunk_count: usize,
}

/// Summarizes a set of stored documents through the LLM gateway.
pub struct SummarizationEngine {
    store: Arc<dyn IndexStore>,
    llm: Arc<dyn SummarizationClient>,
    index: String,
    settings: SummarizeSettings,
    store_policy: UpstreamPolicy,
    llm_policy: UpstreamPolicy,
}

impl SummarizationEngine {
    /// Build an engine reading documents from `index` through `store`.
    pub fn new(
        store: Arc<dyn IndexStore>,
        llm: Arc<dyn SummarizationClient>,
        index: impl Into<String>,
        settings: SummarizeSettings,
        store_policy: UpstreamPolicy,
        llm_policy: UpstreamPolicy,
    ) -> Self {
        Self {
            store,
            llm,
            index: index.into(),
            settings,
            store_policy,
            llm_policy,
        }
    }

    /// Summarize the documents named by `ids`, in the order given.
    ///
    /// Fails with [`DocumentError::InvalidArgument`] before touching any backend when too many
    /// ids are supplied, and with [`DocumentError::NotFound`] when any id is missing. Any failed
    /// chunk aborts the whole request.
    pub async fn summarize(&self, ids: &[String]) -> Result<SummaryOutcome, DocumentError> {
        if ids.len() > self.settings.max_documents {
            return Err(DocumentError::InvalidArgument(format!(
                "at most {} documents can be summarized at once, got {}",
                self.settings.max_documents,
                ids.len()
            )));
        }

        let texts = self.fetch_texts(ids).await?;
        let body = texts.join(" ");
        let chunks = split_into_chunks(&body, self.settings.chunk_chars);
        tracing::debug!(
            documents = ids.len(),
            characters = body.chars().count(),
            chunks = chunks.len(),
            "Summarizing documents"
        );

        let mut summaries = Vec::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            let summary = self.summarize_chunk(chunk).await?;
            tracing::trace!(chunk = position, "Chunk summarized");
            summaries.push(summary);
        }

        Ok(SummaryOutcome {
            summary: summaries.join(" "),
            chunk_count: chunks.len(),
        })
    }

    /// Fetch every document body concurrently, reassembled in `ids` order.
    async fn fetch_texts(&self, ids: &[String]) -> Result<Vec<String>, DocumentError> {
        stream::iter(ids.iter().cloned())
            .map(|id| async move { self.fetch_text(&id).await })
            .buffered(self.settings.fetch_concurrency)
            .try_collect()
            .await
    }

    async fn fetch_text(&self, id: &str) -> Result<String, DocumentError> {
        let store = self.store.as_ref();
        let index = self.index.as_str();
        let document = self
            .store_policy
            .run(Upstream::IndexStore, move || store.get_document(index, id))
            .await
            .inspect_err(|error| {
                tracing::warn!(id, error = %error, "Failed to fetch document for summary");
            })?;
        Ok(document.text)
    }

    async fn summarize_chunk(&self, chunk: &str) -> Result<String, DocumentError> {
        let llm = self.llm.as_ref();
        let model = self.settings.model.as_str();
        let prompt = build_prompt(chunk);
        let prompt = prompt.as_str();
        self.llm_policy
            .run(Upstream::Llm, move || {
                llm.generate_summary(SummarizationRequest {
                    model: model.to_string(),
                    prompt: prompt.to_string(),
                })
            })
            .await
    }
}

/// Prompt sent to the LLM for one chunk.
pub fn build_prompt(chunk: &str) -> String {
    format!("{SUMMARY_PROMPT_PREFIX}{chunk}")
}

/// Split `body` into contiguous, non-overlapping slices of at most `max_chars` characters.
///
/// Every slice except the last holds exactly `max_chars` characters. An empty body yields no
/// chunks.
pub fn split_into_chunks(body: &str, max_chars: usize) -> Vec<&str> {
    if body.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in body.char_indices() {
        if count == max_chars {
            chunks.push(&body[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&body[start..]);
    chunks
}
