//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::retrieval::DEFAULT_TOP_K;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Vector index settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub pinecone_api_key: SecretString,
    pub index_name: String,
    pub embedding_model: String,
    pub top_k: usize,
}

/// Everything the binary needs, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    /// Replaces the built-in onboarding instructions when set.
    pub system_prompt: Option<String>,
    /// Port for the progress endpoint. `None` disables the HTTP server.
    pub http_port: Option<u16>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let openai_key = require("OPENAI_API_KEY")?;
        let pinecone_key = require("PINECONE_API_KEY")?;
        let index_name = require("PINECONE_INDEX_NAME")?;

        let top_k = match get("VENDOR_RETRIEVAL_TOP_K") {
            Some(raw) => parse_top_k(&raw)?,
            None => DEFAULT_TOP_K,
        };

        let http_port = get("VENDOR_HTTP_PORT")
            .map(|raw| {
                raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                    key: "VENDOR_HTTP_PORT".to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            llm: LlmConfig {
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                api_key: SecretString::from(openai_key),
                model: get("VENDOR_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            retrieval: RetrievalConfig {
                pinecone_api_key: SecretString::from(pinecone_key),
                index_name,
                embedding_model: get("VENDOR_EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                top_k,
            },
            system_prompt: get("VENDOR_SYSTEM_PROMPT"),
            http_port,
        })
    }
}

fn parse_top_k(raw: &str) -> Result<usize, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "VENDOR_RETRIEVAL_TOP_K".to_string(),
        message,
    };
    let value = raw.parse::<usize>().map_err(|e| invalid(e.to_string()))?;
    if value == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(value)
}
