#![deny(missing_docs)]

//! Core library for the docsearch hybrid search and summarization service.

/// HTTP routing and JSON handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Hybrid retrieval, summarization, and indexing pipeline.
pub mod documents;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Service activity counters.
pub mod metrics;
/// OpenSearch index store integration.
pub mod opensearch;
/// LLM chat client used for chunk summaries.
pub mod summarization;
