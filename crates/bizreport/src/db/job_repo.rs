//! Job repository: queue operations for the `jobs` table.
//!
//! Every state-changing update is conditional on the row's current status,
//! so two workers sharing one database file can never both win a transition.
//! Callers learn whether they won from the returned `bool`.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub submission_ref: String,
    pub status: String,
    pub progress: u8,
    pub current_stage: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub pipeline: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            submission_ref: row.get("submission_ref")?,
            status: row.get("status")?,
            progress: row.get("progress")?,
            current_stage: row.get("current_stage")?,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            error_message: row.get("error_message")?,
            pipeline: row.get("pipeline")?,
        })
    }

    /// A fresh pending row for `submission_ref`.
    pub fn pending(id: &str, submission_ref: &str, created_at: &str) -> Self {
        Self {
            id: id.to_string(),
            submission_ref: submission_ref.to_string(),
            status: "pending".to_string(),
            progress: 0,
            current_stage: None,
            created_at: created_at.to_string(),
            started_at: None,
            completed_at: None,
            error_message: None,
            pipeline: None,
        }
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub submission_ref: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a job row as-is.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, submission_ref, status, progress, current_stage, created_at,
             started_at, completed_at, error_message, pipeline)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.submission_ref,
                job.status,
                job.progress,
                job.current_stage,
                job.created_at,
                job.started_at,
                job.completed_at,
                job.error_message,
                job.pipeline,
            ],
        )?;
        Ok(())
    })
}

/// Creates a pending job for `submission_ref` and returns it.
///
/// `pipeline` pins the job to a report variant; `None` means the worker's
/// configured default.
pub fn enqueue(
    db: &Database,
    submission_ref: &str,
    pipeline: Option<&str>,
) -> Result<JobRow, DatabaseError> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = super::format_timestamp(chrono::Utc::now());
    let mut job = JobRow::pending(&id, submission_ref, &created_at);
    job.pipeline = pipeline.map(str::to_string);
    insert(db, &job)?;
    Ok(job)
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], JobRow::from_row)
            .optional()?;
        Ok(row)
    })
}

/// Returns the oldest pending job, if any. Ties on `created_at` fall back to
/// insertion order.
pub fn find_oldest_pending(db: &Database) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM jobs WHERE status = 'pending'
                 ORDER BY created_at ASC, rowid ASC LIMIT 1",
                [],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Moves a job from `pending` to `processing`. Returns false if the job was
/// no longer pending when the write happened.
pub fn claim(db: &Database, id: &str, started_at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = 'processing', started_at = ?2, progress = 0,
             current_stage = NULL
             WHERE id = ?1 AND status = 'pending'",
            params![id, started_at],
        )?;
        Ok(changed == 1)
    })
}

/// Records stage progress for a processing job. Stored progress never
/// decreases. Returns false if the job is not processing.
pub fn update_progress(
    db: &Database,
    id: &str,
    progress: u8,
    current_stage: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET progress = MAX(progress, ?2), current_stage = ?3
             WHERE id = ?1 AND status = 'processing'",
            params![id, progress.min(100), current_stage],
        )?;
        Ok(changed == 1)
    })
}

/// Terminal success transition. Only applies to processing jobs.
pub fn mark_completed(db: &Database, id: &str, completed_at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = 'completed', progress = 100, current_stage = NULL,
             completed_at = ?2
             WHERE id = ?1 AND status = 'processing'",
            params![id, completed_at],
        )?;
        Ok(changed == 1)
    })
}

/// Terminal failure transition. Only applies to processing jobs.
pub fn mark_failed(
    db: &Database,
    id: &str,
    error_message: &str,
    completed_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = 'failed', error_message = ?2, current_stage = NULL,
             completed_at = ?3
             WHERE id = ?1 AND status = 'processing'",
            params![id, error_message, completed_at],
        )?;
        Ok(changed == 1)
    })
}

/// Fails every job that has been processing since before `started_before`.
/// Returns the ids of the affected jobs.
pub fn fail_stale_processing(
    db: &Database,
    started_before: &str,
    error_message: &str,
    completed_at: &str,
) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM jobs WHERE status = 'processing'
                 AND (started_at IS NULL OR started_at < ?1)
                 ORDER BY created_at ASC",
            )?;
            let ids = stmt
                .query_map(params![started_before], |r| r.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };
        for id in &ids {
            tx.execute(
                "UPDATE jobs SET status = 'failed', error_message = ?2, current_stage = NULL,
                 completed_at = ?3
                 WHERE id = ?1 AND status = 'processing'",
                params![id, error_message, completed_at],
            )?;
        }
        tx.commit()?;
        Ok(ids)
    })
}

/// Queries jobs with filters, returning (rows, total_count). Newest first.
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref submission_ref) = filter.submission_ref {
            conditions.push(format!("submission_ref = ?{}", param_values.len() + 1));
            param_values.push(Box::new(submission_ref.clone()));
        }
        if let Some(ref from_date) = filter.from_date {
            conditions.push(format!("created_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(from_date.clone()));
        }
        if let Some(ref to_date) = filter.to_date {
            conditions.push(format!("created_at <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(to_date.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
