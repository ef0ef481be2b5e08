//! Retrieval client: query to embedding to nearest documents to flat text.
//!
//! Backend faults never escape this module. Callers get documents or an
//! explicit "no result", and every attempt leaves a retrieval span behind.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod seed;

pub use chunker::TextSplitter;
pub use embedding::{EmbeddingProvider, OpenAiEmbeddings, embedding_dimension};
pub use index::{IndexRecord, PineconeIndex, ServerlessSpec, VectorIndex};
pub use seed::{DirectorySeeder, SeedOutcome, SourceDocument, load_directory};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;
use crate::telemetry::{Span, SpanKind, Telemetry};

/// Namespace the company directory is loaded into.
pub const COMPANY_NAMESPACE: &str = "company-directory";

/// Default number of neighbours per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Span name for directory lookups.
const RETRIEVAL_SPAN_NAME: &str = "Company Database";

/// A retrieved context document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub score: f32,
    /// Source metadata, passed through untouched.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Retrieval client bound to the company-directory namespace of one index.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Up to `top_k` documents for `query`, or `None` when nothing matched or
    /// a backend failed.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        telemetry: &Telemetry,
    ) -> Option<Vec<Document>> {
        let start = Instant::now();
        let span = Span::new(SpanKind::Retrieval, RETRIEVAL_SPAN_NAME)
            .with_input(serde_json::json!({ "query": query, "top_k": top_k }))
            .with_metadata("namespace", COMPANY_NAMESPACE)
            .with_tag("retrieval");

        match self.query_backend(query, top_k).await {
            Ok(documents) => {
                tracing::debug!(query = %query, count = documents.len(), "Retrieved documents");
                let output = documents
                    .iter()
                    .map(|d| d.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                telemetry.record(
                    span.with_metadata("document_count", documents.len())
                        .succeed(output, start.elapsed()),
                );
                if documents.is_empty() {
                    None
                } else {
                    Some(documents)
                }
            }
            Err(e) => {
                tracing::warn!(query = %query, "{} retrieval failed: {}", RETRIEVAL_SPAN_NAME, e);
                telemetry.record(
                    span.with_metadata("document_count", 0)
                        .fail(e.to_string(), start.elapsed()),
                );
                None
            }
        }
    }

    /// Retrieved contents joined by blank lines, or a "nothing found" message.
    pub async fn search(&self, query: &str, telemetry: &Telemetry) -> String {
        match self.retrieve(query, self.top_k, telemetry).await {
            Some(documents) => documents
                .iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            None => nothing_found(query),
        }
    }

    async fn query_backend(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let vector = self.embedder.embed(query).await?;
        self.index.query(COMPANY_NAMESPACE, &vector, top_k).await
    }
}

/// Message returned when retrieval yields nothing.
pub fn nothing_found(query: &str) -> String {
    format!("Nothing found for {query}")
}
