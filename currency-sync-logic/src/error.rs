use sea_orm::DbErr;
use thiserror::Error;

/// Error taxonomy shared across the correlator, cache engine and dedup ledger.
///
/// Variants map to the HTTP statuses the edge surfaces via [`ServiceError::http_status`]
/// and to whether a dead-letter record is produced on the bus side.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("pool or bus overloaded: {0}")]
    Overloaded(String),
    #[error("request timed out")]
    Timeout,
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("db error: {0}")]
    Storage(#[from] DbErr),
    #[error("bus producer fenced: {0}")]
    Fenced(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::InvalidRequest(_) => 400,
            ServiceError::Overloaded(_) => 503,
            ServiceError::Timeout => 504,
            ServiceError::Upstream(_) => 502,
            ServiceError::Storage(_) | ServiceError::Internal(_) => 500,
            ServiceError::Fenced(_) => 500,
        }
    }
}

/// Reasons recorded on dead-letter records (`DlTReason::as_str` is embedded verbatim
/// in the DLT body: `"Reason: <reason>, Message: <original>"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DltReason {
    MissingCorrelation,
    Unrecognised,
    UnknownCode,
    UpstreamUnavailable,
    StorageFailure,
}

impl DltReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DltReason::MissingCorrelation => "MissingCorrelation",
            DltReason::Unrecognised => "Unrecognised",
            DltReason::UnknownCode => "UnknownCode",
            DltReason::UpstreamUnavailable => "UpstreamUnavailable",
            DltReason::StorageFailure => "StorageFailure",
        }
    }
}

/// Runs `f` once; on failure, logs and runs it a second time, returning whichever
/// outcome that second attempt produces. Backs the one-retry-then-fail policy callers
/// apply to storage reads/writes before dead-lettering and surfacing a synthetic error.
pub async fn retry_storage_once<F, Fut, T>(mut f: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    match f().await {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!(err = ?err, "storage operation failed, retrying once");
            f().await
        }
    }
}
