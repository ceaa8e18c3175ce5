use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for every operation in the crate.
///
/// `NotFound` and `Conflict` are expected outcomes the caller is meant to
/// branch on. `Upstream` always reaches the caller, with `retryable`
/// distinguishing transient provider trouble from permanent rejection.
/// `Consistency` marks a detected partial write or aggregate drift; callers
/// normally never see it because the aggregator reconciles by recomputing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("restaurant already exists: {0}")]
    Conflict(String),

    #[error("weather provider failure: {message}")]
    Upstream { retryable: bool, message: String },

    #[error("aggregate inconsistency: {0}")]
    Consistency(String),

    #[error(transparent)]
    Store(#[from] redis::RedisError),

    #[error(transparent)]
    Search(#[from] meilisearch_sdk::errors::Error),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream { retryable: true, .. })
    }
}
