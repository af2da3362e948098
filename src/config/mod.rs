// src/config/mod.rs
// Central configuration for the drift-routing service

pub mod embedding;
pub mod helpers;
pub mod routing;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

pub use routing::{RoutingConfig, RoutingOverrides};

lazy_static! {
    pub static ref CONFIG: DriftConfig = DriftConfig::from_env();
}

/// Top-level configuration, composed from domain configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    pub routing: routing::RoutingConfig,
    pub embedding: embedding::EmbeddingServiceConfig,
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub log_level: String,
}

impl DriftConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            routing: routing::RoutingConfig::from_env(),
            embedding: embedding::EmbeddingServiceConfig::from_env(),
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            log_level: helpers::env_or("DRIFT_LOG_LEVEL", "info"),
        }
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
