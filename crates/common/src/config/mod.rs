//! Configuration management for the PrimeLit pipeline
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/<env>.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Upstream fetcher configuration (PubMed, CrossRef, OpenAlex, MeSH)
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Ingest pipeline configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Opportunity scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Clustering configuration
    #[serde(default)]
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL; credentials come from the environment
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings endpoint
    pub api_base: Option<String>,

    /// API key, if the endpoint requires one
    pub api_key: Option<String>,

    /// Model identifier sent to the endpoint
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension; must match what the endpoint produces
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// NCBI E-utilities base URL (esearch/efetch/esummary)
    #[serde(default = "default_eutils_base")]
    pub eutils_base: String,

    /// CrossRef API base URL
    #[serde(default = "default_crossref_base")]
    pub crossref_base: String,

    /// OpenAlex API base URL
    #[serde(default = "default_openalex_base")]
    pub openalex_base: String,

    /// Optional NCBI API key (raises the rate limit)
    pub ncbi_api_key: Option<String>,

    /// Contact e-mail forwarded to polite-pool upstreams
    pub contact_email: Option<String>,

    /// Bibliographic search deadline in seconds
    #[serde(default = "default_bibliographic_timeout")]
    pub bibliographic_timeout_secs: u64,

    /// Per-article citation lookup deadline in seconds
    #[serde(default = "default_citations_timeout")]
    pub citations_timeout_secs: u64,

    /// Vocabulary expansion deadline in seconds
    #[serde(default = "default_vocabulary_timeout")]
    pub vocabulary_timeout_secs: u64,

    /// Maximum retries per upstream call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Concurrent per-article enrichment tasks
    #[serde(default = "default_ingest_concurrency")]
    pub concurrency: usize,

    /// Hard ceiling on requested max_results
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Recency decay constant in years
    #[serde(default = "default_recency_tau")]
    pub recency_tau_years: f64,

    /// Weight of the novelty component in the overall score
    #[serde(default = "default_novelty_weight")]
    pub novelty_weight: f64,

    /// Weight of the citation-velocity component
    #[serde(default = "default_velocity_weight")]
    pub velocity_weight: f64,

    /// Weight of the recency component
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusteringConfig {
    /// Minimum members for a cluster; smaller groups stay noise
    #[serde(default = "default_cluster_min_size")]
    pub min_cluster_size: usize,

    /// Neighborhood size used to derive the density threshold
    #[serde(default = "default_n_neighbors")]
    pub n_neighbors: usize,

    /// Dimensionality of the projection clustering runs on
    #[serde(default = "default_projection_dims")]
    pub projection_dims: usize,

    /// Seed for the projection; fixed so reruns over the same
    /// vector set produce identical labelings
    #[serde(default = "default_cluster_seed")]
    pub random_seed: u64,
}

// Default value functions
fn default_database_url() -> String {
    "postgres://localhost/primelit".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_embedding_model() -> String {
    "all-mpnet-base-v2".to_string()
}
fn default_embedding_dimension() -> usize {
    768
}
fn default_embedding_timeout() -> u64 {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_eutils_base() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}
fn default_crossref_base() -> String {
    "https://api.crossref.org".to_string()
}
fn default_openalex_base() -> String {
    "https://api.openalex.org".to_string()
}
fn default_bibliographic_timeout() -> u64 {
    30
}
fn default_citations_timeout() -> u64 {
    15
}
fn default_vocabulary_timeout() -> u64 {
    10
}
fn default_ingest_concurrency() -> usize {
    8
}
fn default_max_results_cap() -> usize {
    100
}
fn default_recency_tau() -> f64 {
    5.0
}
fn default_novelty_weight() -> f64 {
    0.4
}
fn default_velocity_weight() -> f64 {
    0.4
}
fn default_recency_weight() -> f64 {
    0.2
}
fn default_cluster_min_size() -> usize {
    5
}
fn default_n_neighbors() -> usize {
    15
}
fn default_projection_dims() -> usize {
    8
}
fn default_cluster_seed() -> u64 {
    42
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Deadline for bibliographic search calls
    pub fn bibliographic_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.bibliographic_timeout_secs)
    }

    /// Deadline for per-article citation lookups
    pub fn citations_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.citations_timeout_secs)
    }

    /// Deadline for vocabulary expansion calls
    pub fn vocabulary_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.vocabulary_timeout_secs)
    }

    /// Deadline for embedding calls
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            eutils_base: default_eutils_base(),
            crossref_base: default_crossref_base(),
            openalex_base: default_openalex_base(),
            ncbi_api_key: None,
            contact_email: None,
            bibliographic_timeout_secs: default_bibliographic_timeout(),
            citations_timeout_secs: default_citations_timeout(),
            vocabulary_timeout_secs: default_vocabulary_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_ingest_concurrency(),
            max_results_cap: default_max_results_cap(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_tau_years: default_recency_tau(),
            novelty_weight: default_novelty_weight(),
            velocity_weight: default_velocity_weight(),
            recency_weight: default_recency_weight(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_cluster_min_size(),
            n_neighbors: default_n_neighbors(),
            projection_dims: default_projection_dims(),
            random_seed: default_cluster_seed(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            fetch: FetchConfig::default(),
            ingest: IngestConfig::default(),
            scoring: ScoringConfig::default(),
            clustering: ClusteringConfig::default(),
        }
    }
}
