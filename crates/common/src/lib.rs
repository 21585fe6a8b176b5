//! PrimeLit Common Library
//!
//! Shared code for the Search–Ingest–Score pipeline:
//! - Database models, the Store contract, and its implementations
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and tracing helpers

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{Repository, Store};
pub use embeddings::Embedder;
pub use errors::{AppError, Result, ScoreStatus};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
