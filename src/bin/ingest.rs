//! Bulk loader: walks a directory of text files and indexes each one as a document.
//!
//! Uses the same embed-then-write path as `POST /documents`, so every file is searchable as
//! soon as it is reported. The target index must already exist (start the server once first).
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use docsearch::{config, documents::DocumentService, logging};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docsearch-ingest",
    about = "Index a directory of text files into the document index"
)]
struct Cli {
    /// Directory scanned recursively for documents.
    #[arg(long)]
    dir: PathBuf,
    /// Stop after this many documents.
    #[arg(long, default_value_t = 2000)]
    max_records: usize,
    /// File extension treated as a document.
    #[arg(long, default_value = "txt")]
    extension: String,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config().context("failed to load configuration")?;
    logging::init_tracing();

    let service = DocumentService::from_config().context("failed to build document service")?;
    if !service
        .index_ready()
        .await
        .context("failed to check the document index")?
    {
        bail!(
            "index '{}' does not exist",
            config::get_config().opensearch_index_name
        );
    }

    let files = collect_files(&cli.dir, &cli.extension, cli.max_records);
    tracing::info!(dir = %cli.dir.display(), files = files.len(), "Starting ingestion");

    let mut indexed = 0usize;
    for path in files {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if text.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Skipping empty file");
            continue;
        }
        let title = derive_title(&path, &text);
        let document = service
            .index_document(title, text)
            .await
            .with_context(|| format!("failed to index {}", path.display()))?;
        indexed += 1;
        tracing::info!(id = %document.id, path = %path.display(), indexed, "Indexed document");
    }

    tracing::info!(indexed, "Ingestion finished");
    Ok(())
}

/// Collect up to `limit` files with `extension` under `root`, in a stable order.
fn collect_files(root: &Path, extension: &str, limit: usize) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .take(limit)
        .collect()
}

/// Use the first non-empty line as the title, falling back to the file stem.
fn derive_title(path: &Path, text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}
