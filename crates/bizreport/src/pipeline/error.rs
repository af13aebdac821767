use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::StorageError;
use crate::generator::GenerationError;
use crate::storage::PersistenceError;

/// Ends the whole job. The job moves to `failed` with this message.
#[derive(Error, Debug)]
pub enum FatalJobError {
    #[error("Submission '{0}' not found")]
    SubmissionNotFound(String),

    #[error("Submission lookup failed: {0}")]
    SubmissionLookup(#[source] DatabaseError),

    #[error("interrupted by shutdown")]
    Interrupted,

    #[error("Job output directory unavailable: {0}")]
    OutputUnavailable(#[from] StorageError),
}

/// Ends one stage. The report is left out of the manifest and the job
/// carries on.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}
