//! PrimeLit Ingestion
//!
//! Bibliographic, citation, and vocabulary adapters plus the ingest
//! processor that realizes one search: expand the query, fetch
//! articles, enrich with citations and embeddings, and link everything
//! to the search record.

pub mod adapters;
pub mod processor;
pub mod query;

pub use adapters::{
    ArticleRecord, BibliographicSource, CitationEnricher, CitationKey, CitationSnapshot,
    CitationSource, CrossrefClient, MeshVocabulary, OpenAlexClient, PubMedClient,
    VocabularySource,
};
pub use processor::{IngestOutcome, Ingestor};
