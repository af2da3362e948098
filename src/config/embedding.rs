// src/config/embedding.rs
// Configuration for the remote embedding service client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    pub base_url: String,
    pub dimension: usize,
    pub request_timeout_ms: u64,
}

impl EmbeddingServiceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: super::helpers::env_or("EMBEDDING_SERVICE_URL", "http://localhost:8001"),
            dimension: super::helpers::env_parsed("EMBEDDING_DIMENSION", 384),
            request_timeout_ms: super::helpers::env_parsed("EMBEDDING_TIMEOUT_MS", 5_000),
        }
    }
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            dimension: 384,
            request_timeout_ms: 5_000,
        }
    }
}
