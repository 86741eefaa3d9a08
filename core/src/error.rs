use thiserror::Error;

/// Errors raised by retrieval, benchmarking and evaluation.
///
/// None of these are retried: every operation that can produce them is a
/// deterministic computation over an index snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("unknown model `{0}`, expected `bm25` or `tfidf`")]
    InvalidModel(String),

    #[error("query `{0}` contains no searchable terms")]
    InvalidQuery(String),

    #[error("k must be a positive integer, got {0}")]
    InvalidK(i64),

    #[error("index has not been built yet")]
    IndexUnavailable,
}

impl SearchError {
    /// Machine-readable name used at the HTTP boundary.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidModel(_) => "invalid_model",
            Self::InvalidQuery(_) => "invalid_query",
            Self::InvalidK(_) => "invalid_k",
            Self::IndexUnavailable => "index_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
