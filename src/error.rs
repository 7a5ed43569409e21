use thiserror::Error;

/// Tagged error variants surfaced across the solver core's stage boundary.
///
/// Per-cluster infeasibility is deliberately *not* a variant here: it is a
/// metric, not an error, so it lives in [`crate::pipeline::JobMetrics`]
/// instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("catalog invalid: {reason}")]
    CatalogInvalid { reason: String },

    #[error("job cancelled")]
    Cancelled,

    #[error("resource monitor reached emergency level for job {job_id}")]
    ResourceEmergency { job_id: String },

    #[error("stage '{stage}' failed: {cause}")]
    StageFailure { stage: String, cause: String },

    #[error("failed to parse catalog JSON: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
