use std::fmt;

use serde::{Deserialize, Serialize};
use stockroom_rag::{AssistantConfig, BuilderConfig};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model used for answer generation.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4-turbo-preview".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_sqlite_path() -> String {
    "./data/inventory.db".into()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    /// Build the index once before the gateway starts serving.
    #[serde(default)]
    pub refresh_on_startup: bool,
}

fn default_batch_size() -> usize {
    10
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    20
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            refresh_on_startup: false,
        }
    }
}

impl IndexConfig {
    #[must_use]
    pub fn builder(&self) -> BuilderConfig {
        BuilderConfig {
            batch_size: self.batch_size,
            max_concurrent_batches: self.max_concurrent_batches,
        }
    }

    #[must_use]
    pub fn assistant(&self) -> AssistantConfig {
        AssistantConfig {
            top_k: self.top_k,
            max_top_k: self.max_top_k,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_max_body() -> usize {
    1_048_576
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            max_body_size: default_gateway_max_body(),
        }
    }
}

/// Wrapper for sensitive strings with redacted Debug/Display.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Credentials taken from the environment, never from the config file.
#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
}
