//! Error types for the PrimeLit pipeline
//!
//! One shared error enum for the whole workspace. Remote failures are
//! split into transient (retryable) and permanent (malformed upstream
//! data) so callers can apply the right policy per adapter.

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Keyword list was empty after normalization
    #[error("empty query: no keywords remain after normalization")]
    EmptyQuery,

    /// Retryable upstream failure (network, timeout, 5xx)
    #[error("transient failure from {service}: {message}")]
    TransientRemote { service: String, message: String },

    /// Non-retryable upstream failure (malformed document, contract break)
    #[error("permanent failure from {service}: {message}")]
    PermanentRemote { service: String, message: String },

    #[error("search not found: {id}")]
    SearchNotFound { id: i64 },

    #[error("article not found: {pmid}")]
    ArticleNotFound { pmid: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a transient remote failure
    pub fn transient(service: &str, message: impl Into<String>) -> Self {
        AppError::TransientRemote {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a permanent remote failure
    pub fn permanent(service: &str, message: impl Into<String>) -> Self {
        AppError::PermanentRemote {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Whether a retry with backoff may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientRemote { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("upstream")
            .to_string();
        // Decode failures mean the upstream sent something we cannot read;
        // connect errors, timeouts, and 5xx statuses can recover on retry.
        if err.is_decode() {
            AppError::PermanentRemote {
                service,
                message: err.to_string(),
            }
        } else {
            AppError::TransientRemote {
                service,
                message: err.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

/// Outcome of a score lookup. Scoring runs in the background, so a
/// missing score is an expected state rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreStatus<T> {
    Ready(T),
    NotReady,
}

impl<T> ScoreStatus<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ScoreStatus::Ready(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ScoreStatus::Ready(v) => Some(v),
            ScoreStatus::NotReady => None,
        }
    }
}
