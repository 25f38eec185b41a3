//! Document pipeline: hybrid retrieval, multi-document summarization, and indexing.

pub mod retrieval;
mod service;
pub mod summarize;
pub mod types;
pub mod upstream;

pub use retrieval::{RetrievalEngine, SearchSettings};
pub use service::{DocumentApi, DocumentService, ServiceSettings};
pub use summarize::{SummarizationEngine, SummarizeSettings, SummaryOutcome};
pub use types::{Document, DocumentError, SearchResult, Upstream};
pub use upstream::UpstreamPolicy;
