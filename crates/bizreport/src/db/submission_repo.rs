//! Submission repository: read access to assessment submissions.
//!
//! Submissions are written by the intake side; the worker only reads them.
//! `insert` exists for seeding and tests.

use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{Database, DatabaseError};

/// One stored assessment submission. Profile and responses are opaque JSON
/// handed to the content generator unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub submission_ref: String,
    pub user_id: String,
    pub company_profile: Value,
    pub responses: Vec<Value>,
    pub created_at: String,
}

/// Inserts a submission.
pub fn insert(db: &Database, submission: &SubmissionRow) -> Result<(), DatabaseError> {
    let profile = submission.company_profile.to_string();
    let responses = Value::Array(submission.responses.clone()).to_string();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO submissions (submission_ref, user_id, company_profile, responses, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                submission.submission_ref,
                submission.user_id,
                profile,
                responses,
                submission.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Fetches a submission by reference.
pub fn find_by_ref(
    db: &Database,
    submission_ref: &str,
) -> Result<Option<SubmissionRow>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT submission_ref, user_id, company_profile, responses, created_at
                 FROM submissions WHERE submission_ref = ?1",
                params![submission_ref],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        Ok(row)
    })?;

    let Some((submission_ref, user_id, profile, responses, created_at)) = raw else {
        return Ok(None);
    };

    let company_profile: Value =
        serde_json::from_str(&profile).map_err(|_| DatabaseError::InvalidValue {
            column: "company_profile",
            value: submission_ref.clone(),
        })?;
    let responses = match serde_json::from_str::<Value>(&responses) {
        Ok(Value::Array(items)) => items,
        _ => {
            return Err(DatabaseError::InvalidValue {
                column: "responses",
                value: submission_ref,
            })
        }
    };

    Ok(Some(SubmissionRow {
        submission_ref,
        user_id,
        company_profile,
        responses,
        created_at,
    }))
}
