//! Error types for vendor onboarding.

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Embedding and vector-index errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Embedding generation failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("Vector index query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Vector index {index} not found. Run `vendor-onboard seed` to create and load it.")]
    IndexNotFound { index: String },

    #[error("Invalid response from vector index: {reason}")]
    InvalidResponse { reason: String },

    #[error("Failed to create index {index}: {reason}")]
    IndexCreationFailed { index: String, reason: String },

    #[error("Vector upsert failed: {reason}")]
    UpsertFailed { reason: String },

    #[error("Failed to read {path}: {reason}")]
    DirectoryRead { path: String, reason: String },
}

/// Session store errors. The in-memory store never produces one; other
/// backends behind `SessionStore` report through it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Tool dispatch and execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Telemetry sink errors. Never propagated past the `Telemetry` handle.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Sink {sink} rejected span: {reason}")]
    Rejected { sink: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
