use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing search, summarization, and indexing activity.
#[derive(Default)]
pub struct ServiceMetrics {
    searches_served: AtomicU64,
    summaries_generated: AtomicU64,
    summary_chunks: AtomicU64,
    documents_indexed: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed search.
    pub fn record_search(&self) {
        self.searches_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed summary and the number of chunks sent to the LLM for it.
    pub fn record_summary(&self, chunk_count: u64) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
        self.summary_chunks.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a document written to the index.
    pub fn record_document(&self) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches_served: self.searches_served.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            summary_chunks: self.summary_chunks.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the service counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of searches answered since startup.
    pub searches_served: u64,
    /// Number of summaries returned since startup.
    pub summaries_generated: u64,
    /// Total LLM chunk calls made across all summaries.
    pub summary_chunks: u64,
    /// Number of documents written since startup.
    pub documents_indexed: u64,
}
