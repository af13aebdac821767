use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PipelineVariant;
use crate::db::job_repo::{self, JobRow};
use crate::db::{parse_timestamp, Database, DatabaseError};

use super::state::JobStatus;

/// A job as the worker sees it, decoded from its stored row.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub submission_ref: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_stage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Variant pinned at enqueue time. `None` runs the worker default.
    pub pipeline: Option<PipelineVariant>,
}

impl TryFrom<JobRow> for Job {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let pipeline = row
            .pipeline
            .as_deref()
            .map(|p| {
                p.parse::<PipelineVariant>()
                    .map_err(|_| DatabaseError::InvalidValue {
                        column: "pipeline",
                        value: p.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            status: row.status.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
            started_at: row.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: row.completed_at.as_deref().map(parse_timestamp).transpose()?,
            id: row.id,
            submission_ref: row.submission_ref,
            progress: row.progress,
            current_stage: row.current_stage,
            error_message: row.error_message,
            pipeline,
        })
    }
}

/// How one pipeline run ended.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub artifacts: usize,
    pub failed_stages: usize,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: &Job, artifacts: usize, failed_stages: usize) -> Self {
        Self {
            job_id: job.id.clone(),
            success: true,
            artifacts,
            failed_stages,
            error: None,
        }
    }

    pub fn failure(job: &Job, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            success: false,
            artifacts: 0,
            failed_stages: 0,
            error: Some(error),
        }
    }
}

/// What an observer may read about a job at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u8,
    pub current_stage: Option<String>,
}

/// Reads `{status, progress, currentStage}` for a job.
pub fn job_status(db: &Database, job_id: &str) -> Result<Option<JobStatusView>, DatabaseError> {
    let Some(row) = job_repo::find_by_id(db, job_id)? else {
        return Ok(None);
    };
    Ok(Some(JobStatusView {
        status: row.status.parse()?,
        progress: row.progress,
        current_stage: row.current_stage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_from_pending_row() {
        let row = JobRow::pending("job-1", "sub-1", "2026-03-01T12:00:00.000000Z");
        let job = Job::try_from(row).unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.started_at.is_none());
        assert!(job.pipeline.is_none());
    }

    #[test]
    fn test_job_with_pinned_pipeline() {
        let mut row = JobRow::pending("job-1", "sub-1", "2026-03-01T12:00:00.000000Z");
        row.pipeline = Some("full".to_string());
        assert_eq!(Job::try_from(row).unwrap().pipeline, Some(PipelineVariant::Full));
    }

    #[test]
    fn test_job_with_bad_pipeline() {
        let mut row = JobRow::pending("job-1", "sub-1", "2026-03-01T12:00:00.000000Z");
        row.pipeline = Some("deluxe".to_string());
        assert!(matches!(
            Job::try_from(row),
            Err(DatabaseError::InvalidValue { column: "pipeline", .. })
        ));
    }

    #[test]
    fn test_job_status_view() {
        let db = Database::open_in_memory().unwrap();
        let row = job_repo::enqueue(&db, "sub-1", None).unwrap();
        job_repo::claim(&db, &row.id, "2026-03-01T12:00:00.000000Z").unwrap();
        job_repo::update_progress(&db, &row.id, 25, "Financial Health Assessment").unwrap();

        let view = job_status(&db, &row.id).unwrap().unwrap();
        assert_eq!(view.status, JobStatus::Processing);
        assert_eq!(view.progress, 25);
        assert_eq!(view.current_stage.as_deref(), Some("Financial Health Assessment"));

        assert!(job_status(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_status_view_serializes_camel_case() {
        let view = JobStatusView {
            status: JobStatus::Processing,
            progress: 50,
            current_stage: Some("SWOT Analysis".to_string()),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["currentStage"], "SWOT Analysis");
    }
}
