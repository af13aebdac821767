//! Report repository: one row per generated artifact.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A stored report row.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub user_id: String,
    pub submission_ref: String,
    pub report_type: String,
    pub job_id: String,
    pub title: String,
    pub status: String,
    pub content: String,
    pub page_estimate: u32,
    pub generated_at: String,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            submission_ref: row.get("submission_ref")?,
            report_type: row.get("report_type")?,
            job_id: row.get("job_id")?,
            title: row.get("title")?,
            status: row.get("status")?,
            content: row.get("content")?,
            page_estimate: row.get("page_estimate")?,
            generated_at: row.get("generated_at")?,
        })
    }
}

/// Inserts or replaces the row for `(user_id, submission_ref, report_type)`.
pub fn upsert(db: &Database, report: &ReportRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO reports (user_id, submission_ref, report_type, job_id, title, status,
             content, page_estimate, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (user_id, submission_ref, report_type) DO UPDATE SET
               job_id = excluded.job_id,
               title = excluded.title,
               status = excluded.status,
               content = excluded.content,
               page_estimate = excluded.page_estimate,
               generated_at = excluded.generated_at",
            params![
                report.user_id,
                report.submission_ref,
                report.report_type,
                report.job_id,
                report.title,
                report.status,
                report.content,
                report.page_estimate,
                report.generated_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists rows written by one job, in insertion order.
pub fn list_by_job(db: &Database, job_id: &str) -> Result<Vec<ReportRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM reports WHERE job_id = ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![job_id], ReportRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts rows for one submission.
pub fn count_for_submission(
    db: &Database,
    user_id: &str,
    submission_ref: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE user_id = ?1 AND submission_ref = ?2",
            params![user_id, submission_ref],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
