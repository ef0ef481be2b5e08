//! Vector index backends.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;
use crate::retrieval::Document;

/// Metadata key holding the chunk text, as written by the directory loader.
pub const TEXT_METADATA_KEY: &str = "text";

const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";
const PINECONE_API_VERSION: &str = "2024-07";

/// Polls before a freshly created index is given up on.
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One embedded chunk to store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Nearest-neighbour search over stored document embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `top_k` matches in `namespace`, most relevant first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<Document>, RetrievalError>;

    /// Insert or overwrite records by id. Returns how many were written.
    async fn upsert(
        &self,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<usize, RetrievalError>;

    /// Number of vectors stored in `namespace`.
    async fn vector_count(&self, namespace: &str) -> Result<u64, RetrievalError>;
}

/// Serverless placement for indexes created by the directory loader.
#[derive(Debug, Clone)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

impl Default for ServerlessSpec {
    fn default() -> Self {
        Self {
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Pinecone serverless index reached through its data-plane host.
pub struct PineconeIndex {
    host: String,
    api_key: SecretString,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

impl PineconeIndex {
    /// Use a known data-plane host.
    pub fn with_host(host: &str, api_key: SecretString) -> Self {
        let host = if host.starts_with("http") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };
        Self {
            host,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Resolve `index_name` to its host. A missing index is an error.
    pub async fn connect(index_name: &str, api_key: SecretString) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::new();
        match describe(&client, index_name, &api_key).await? {
            Some(described) => {
                let host = described.host;
                tracing::info!(index = %index_name, host = %host, "Connected to existing index");
                Ok(Self::with_host(&host, api_key))
            }
            None => Err(RetrievalError::IndexNotFound {
                index: index_name.to_string(),
            }),
        }
    }

    /// Like `connect`, but creates a cosine serverless index of `dimension`
    /// when none exists and waits until it is ready.
    pub async fn connect_or_create(
        index_name: &str,
        api_key: SecretString,
        dimension: usize,
        spec: &ServerlessSpec,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::new();
        if let Some(described) = describe(&client, index_name, &api_key).await? {
            tracing::info!(index = %index_name, "Index already exists");
            return Ok(Self::with_host(&described.host, api_key));
        }

        tracing::info!(index = %index_name, dimension, "Creating index");
        let creation_failed = |reason: String| RetrievalError::IndexCreationFailed {
            index: index_name.to_string(),
            reason,
        };
        let body = serde_json::json!({
            "name": index_name,
            "dimension": dimension,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": spec.cloud, "region": spec.region}},
        });
        let response = client
            .post(format!("{}/indexes", PINECONE_CONTROL_PLANE))
            .header("Api-Key", api_key.expose_secret())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| creation_failed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(creation_failed(format!("HTTP {}: {}", status, body)));
        }

        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(described) = describe(&client, index_name, &api_key).await? {
                let ready = described.status.as_ref().is_some_and(|s| s.ready);
                if ready && !described.host.is_empty() {
                    tracing::info!(index = %index_name, "Index ready");
                    return Ok(Self::with_host(&described.host, api_key));
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(creation_failed("index did not become ready".to_string()))
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(body)
            .send()
            .await
    }
}

/// Control-plane description of `index_name`, or `None` when it does not exist.
async fn describe(
    client: &reqwest::Client,
    index_name: &str,
    api_key: &SecretString,
) -> Result<Option<DescribeIndexResponse>, RetrievalError> {
    let url = format!("{}/indexes/{}", PINECONE_CONTROL_PLANE, index_name);
    let response = client
        .get(&url)
        .header("Api-Key", api_key.expose_secret())
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
        .send()
        .await
        .map_err(|e| RetrievalError::QueryFailed {
            reason: e.to_string(),
        })?;

    if response.status().as_u16() == 404 {
        return Ok(None);
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(RetrievalError::QueryFailed {
            reason: format!("HTTP {}: {}", status, body),
        });
    }

    response
        .json()
        .await
        .map(Some)
        .map_err(|e| RetrievalError::InvalidResponse {
            reason: e.to_string(),
        })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        let body = serde_json::json!({
            "namespace": namespace,
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });

        let response = self
            .post("/query", &body)
            .await
            .map_err(|e| RetrievalError::QueryFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse {
                reason: e.to_string(),
            })?;

        Ok(parsed.matches.into_iter().map(into_document).collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<usize, RetrievalError> {
        if records.is_empty() {
            return Ok(0);
        }
        let body = serde_json::json!({
            "vectors": records,
            "namespace": namespace,
        });

        let response = self
            .post("/vectors/upsert", &body)
            .await
            .map_err(|e| RetrievalError::UpsertFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::UpsertFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse {
                reason: e.to_string(),
            })?;
        Ok(parsed.upserted_count)
    }

    async fn vector_count(&self, namespace: &str) -> Result<u64, RetrievalError> {
        let response = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await
            .map_err(|e| RetrievalError::QueryFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::QueryFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let stats: IndexStats = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse {
                reason: e.to_string(),
            })?;
        Ok(namespace_count(&stats, namespace))
    }
}

fn namespace_count(stats: &IndexStats, namespace: &str) -> u64 {
    stats
        .namespaces
        .get(namespace)
        .map(|ns| ns.vector_count)
        .unwrap_or(0)
}

/// Chunk text comes from the `text` metadata key; everything else passes
/// through as source metadata.
fn into_document(m: QueryMatch) -> Document {
    let mut metadata = m.metadata.unwrap_or_default();
    let content = match metadata.remove(TEXT_METADATA_KEY) {
        Some(serde_json::Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    if !m.id.is_empty() {
        metadata
            .entry("id")
            .or_insert_with(|| serde_json::Value::String(m.id.clone()));
    }
    Document {
        content,
        score: m.score,
        metadata,
    }
}
