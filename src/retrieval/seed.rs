//! Company-directory loader: read source files, chunk them, embed the
//! chunks, and upsert them into the directory namespace.

use std::path::Path;
use std::sync::Arc;

use crate::error::RetrievalError;
use crate::retrieval::COMPANY_NAMESPACE;
use crate::retrieval::chunker::TextSplitter;
use crate::retrieval::embedding::EmbeddingProvider;
use crate::retrieval::index::{IndexRecord, TEXT_METADATA_KEY, VectorIndex};

/// Chunks embedded and upserted per request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Extensions picked up by the loader, in load order.
const SOURCE_EXTENSIONS: &[&str] = &["md", "txt"];

/// One source file's text.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

/// Markdown files, then text files, directly under `dir`. Each group is
/// sorted by path.
pub async fn load_directory(dir: &Path) -> Result<Vec<SourceDocument>, RetrievalError> {
    let read_failed = |path: &Path, e: std::io::Error| RetrievalError::DirectoryRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| read_failed(dir, e))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| read_failed(dir, e))? {
        let file_type = entry.file_type().await.map_err(|e| read_failed(dir, e))?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for extension in SOURCE_EXTENSIONS {
        for path in paths
            .iter()
            .filter(|p| p.extension().is_some_and(|e| e == *extension))
        {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| read_failed(path.as_path(), e))?;
            documents.push(SourceDocument {
                source: path.display().to_string(),
                text,
            });
        }
    }
    tracing::info!(dir = %dir.display(), documents = documents.len(), "Loaded directory");
    Ok(documents)
}

/// What a seeding run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The namespace already held vectors and the run was not forced.
    Skipped { existing: u64 },
    Uploaded { documents: usize, chunks: usize },
}

#[derive(Debug, Clone)]
struct Chunk {
    id: String,
    source: String,
    text: String,
}

impl Chunk {
    fn into_record(self, values: Vec<f32>) -> IndexRecord {
        let mut metadata = serde_json::Map::new();
        metadata.insert(TEXT_METADATA_KEY.to_string(), self.text.into());
        metadata.insert("source".to_string(), self.source.into());
        IndexRecord {
            id: self.id,
            values,
            metadata,
        }
    }
}

/// Loads source documents into the company-directory namespace.
pub struct DirectorySeeder {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    splitter: TextSplitter,
    batch_size: usize,
}

impl DirectorySeeder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            splitter: TextSplitter::directory(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Chunk, embed, and upsert `documents`. An already populated namespace
    /// is left alone unless `force` is set. Chunk ids are `source#n`, so a
    /// forced rerun overwrites the earlier vectors.
    pub async fn seed(
        &self,
        documents: &[SourceDocument],
        force: bool,
    ) -> Result<SeedOutcome, RetrievalError> {
        if !force {
            match self.index.vector_count(COMPANY_NAMESPACE).await {
                Ok(existing) if existing > 0 => {
                    tracing::info!(
                        namespace = COMPANY_NAMESPACE,
                        existing,
                        "Namespace already populated, skipping upload"
                    );
                    return Ok(SeedOutcome::Skipped { existing });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not read index stats, uploading anyway: {}", e),
            }
        }

        let chunks = self.chunk(documents);
        tracing::info!(
            namespace = COMPANY_NAMESPACE,
            documents = documents.len(),
            chunks = chunks.len(),
            "Uploading chunks"
        );

        let mut uploaded = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(RetrievalError::EmbeddingFailed {
                    reason: format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
                });
            }
            let records: Vec<IndexRecord> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, values)| chunk.into_record(values))
                .collect();
            uploaded += self.index.upsert(COMPANY_NAMESPACE, &records).await?;
            tracing::debug!(uploaded, total = chunks.len(), "Upserted batch");
        }

        Ok(SeedOutcome::Uploaded {
            documents: documents.len(),
            chunks: uploaded,
        })
    }

    fn chunk(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .split_text(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(i, text)| Chunk {
                        id: format!("{}#{}", doc.source, i),
                        source: doc.source.clone(),
                        text,
                    })
            })
            .collect()
    }
}
