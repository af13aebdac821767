//! Job lifecycle: `pending -> processing -> completed | failed`.
//!
//! [`JobStatus::can_transition_to`] is the rule; [`JobStateMachine`] applies
//! it to the store through conditional updates, so a transition that lost a
//! race is reported instead of silently overwriting another writer.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{format_timestamp, job_repo, Database, DatabaseError};

use super::job::Job;

/// Message recorded on jobs that exceeded the claim timeout.
pub const ABANDONED_MESSAGE: &str = "abandoned: worker stopped while processing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DatabaseError::InvalidValue {
                column: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Job '{job_id}' cannot move from {from} to {to}")]
    Rejected {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// The claim went through but the stored row could not be decoded. The
    /// job has already been moved on to `failed`.
    #[error("Job '{job_id}' has an invalid record: {source}")]
    Invalid {
        job_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Applies lifecycle transitions to stored jobs.
#[derive(Clone)]
pub struct JobStateMachine {
    db: Database,
}

impl JobStateMachine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// `pending -> processing`, stamping `started_at`. Returns the claimed job.
    pub fn claim(&self, job_id: &str) -> Result<Job, TransitionError> {
        let started_at = format_timestamp(Utc::now());
        if !job_repo::claim(&self.db, job_id, &started_at)? {
            return Err(self.rejected(job_id, JobStatus::Processing));
        }
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| TransitionError::NotFound(job_id.to_string()))?;

        match Job::try_from(row) {
            Ok(job) => Ok(job),
            Err(source) => {
                let message = format!("Invalid job record: {}", source);
                job_repo::mark_failed(
                    &self.db,
                    job_id,
                    &message,
                    &format_timestamp(Utc::now()),
                )?;
                Err(TransitionError::Invalid {
                    job_id: job_id.to_string(),
                    source,
                })
            }
        }
    }

    /// `processing -> completed`: progress 100, stage cleared.
    pub fn complete(&self, job_id: &str) -> Result<(), TransitionError> {
        let completed_at = format_timestamp(Utc::now());
        if !job_repo::mark_completed(&self.db, job_id, &completed_at)? {
            return Err(self.rejected(job_id, JobStatus::Completed));
        }
        Ok(())
    }

    /// `processing -> failed` with the error that ended the job.
    pub fn fail(&self, job_id: &str, error_message: &str) -> Result<(), TransitionError> {
        let completed_at = format_timestamp(Utc::now());
        if !job_repo::mark_failed(&self.db, job_id, error_message, &completed_at)? {
            return Err(self.rejected(job_id, JobStatus::Failed));
        }
        Ok(())
    }

    /// Fails jobs left processing for longer than `claim_timeout`. Returns the
    /// affected ids.
    pub fn fail_abandoned(&self, claim_timeout: Duration) -> Result<Vec<String>, DatabaseError> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(claim_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let cutoff = format_timestamp(now - timeout);
        job_repo::fail_stale_processing(&self.db, &cutoff, ABANDONED_MESSAGE, &format_timestamp(now))
    }

    fn rejected(&self, job_id: &str, to: JobStatus) -> TransitionError {
        let current = job_repo::find_by_id(&self.db, job_id)
            .ok()
            .flatten()
            .and_then(|row| row.status.parse::<JobStatus>().ok());
        match current {
            Some(from) => TransitionError::Rejected {
                job_id: job_id.to_string(),
                from,
                to,
            },
            None => TransitionError::NotFound(job_id.to_string()),
        }
    }
}
