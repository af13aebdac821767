//! Durable storage for one generated artifact: the HTML file, and optionally
//! a row in the `reports` table. Both writes replace earlier copies for the
//! same report type, so persisting twice never duplicates.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::filesystem::ArtifactStore;
use super::manifest::{estimate_pages, Manifest, ManifestEntry};
use crate::db::report_repo::{self, ReportRow};
use crate::db::submission_repo::SubmissionRow;
use crate::db::{format_timestamp, Database, DatabaseError};
use crate::error::StorageError;
use crate::sanitize::escape_html;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Artifact file: {0}")]
    Storage(#[from] StorageError),

    #[error("Report row: {0}")]
    Database(#[from] DatabaseError),
}

/// Output of one successful stage.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub report_type: String,
    pub title: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    /// Estimated pages.
    pub size_metric: u32,
}

impl GeneratedArtifact {
    pub fn new(report_type: &str, title: &str, content: String, generated_at: DateTime<Utc>) -> Self {
        let size_metric = estimate_pages(&content);
        Self {
            report_type: report_type.to_string(),
            title: title.to_string(),
            content,
            generated_at,
            size_metric,
        }
    }
}

pub struct ArtifactPersister {
    store: ArtifactStore,
    reports: Option<Database>,
}

impl ArtifactPersister {
    /// Persists files only.
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            reports: None,
        }
    }

    /// Persists files and upserts a report row per artifact.
    pub fn with_report_rows(store: ArtifactStore, db: Database) -> Self {
        Self {
            store,
            reports: Some(db),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Stores one artifact and returns its manifest entry.
    pub fn persist(
        &self,
        job_id: &str,
        submission: &SubmissionRow,
        artifact: &GeneratedArtifact,
    ) -> Result<ManifestEntry, PersistenceError> {
        let document = wrap_document(&artifact.title, &artifact.content);
        let path = self
            .store
            .store_artifact(job_id, &artifact.report_type, document.as_bytes())?;

        if let Some(db) = &self.reports {
            let upserted = report_repo::upsert(
                db,
                &ReportRow {
                    user_id: submission.user_id.clone(),
                    submission_ref: submission.submission_ref.clone(),
                    report_type: artifact.report_type.clone(),
                    job_id: job_id.to_string(),
                    title: artifact.title.clone(),
                    status: "completed".to_string(),
                    content: document.clone(),
                    page_estimate: artifact.size_metric,
                    generated_at: format_timestamp(artifact.generated_at),
                },
            );
            if let Err(e) = upserted {
                // The stage counts as failed, so its file must not outlive it
                if let Err(cleanup) = self.store.remove_artifact(job_id, &artifact.report_type) {
                    tracing::warn!(
                        report_type = %artifact.report_type,
                        error = %cleanup,
                        "Could not remove artifact after report row failure"
                    );
                }
                return Err(e.into());
            }
        }

        tracing::debug!(
            report_type = %artifact.report_type,
            pages = artifact.size_metric,
            file = %crate::sanitize::redact_path(&path),
            "Artifact persisted"
        );

        Ok(ManifestEntry {
            report_type: artifact.report_type.clone(),
            title: artifact.title.clone(),
            size_metric: artifact.size_metric,
            generated_at: artifact.generated_at,
            file: format!("{}.html", artifact.report_type),
        })
    }

    /// Writes `manifest.json` for the job.
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf, StorageError> {
        let json = serde_json::to_vec_pretty(manifest)?;
        self.store.store_manifest(&manifest.job_id, &json)
    }
}

/// Wraps a bare fragment in a minimal HTML document. Full documents pass
/// through unchanged.
pub fn wrap_document(title: &str, body: &str) -> String {
    let head = body.trim_start();
    let lower: String = head.chars().take(16).collect::<String>().to_ascii_lowercase();
    if lower.starts_with("<!doctype") || lower.starts_with("<html") {
        return body.to_string();
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        body = body.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn submission() -> SubmissionRow {
        SubmissionRow {
            submission_ref: "sub-1".to_string(),
            user_id: "user-1".to_string(),
            company_profile: json!({}),
            responses: vec![],
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_wrap_fragment() {
        let doc = wrap_document("R&D Review", "<h2>Overview</h2>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>R&amp;D Review</title>"));
        assert!(doc.contains("<h2>Overview</h2>"));
    }

    #[test]
    fn test_full_document_passes_through() {
        let body = "  <!doctype html><html><body>x</body></html>";
        assert_eq!(wrap_document("T", body), body);
    }

    #[test]
    fn test_persist_writes_file_and_row() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let persister =
            ArtifactPersister::with_report_rows(ArtifactStore::new(temp_dir.path()), db.clone());

        let artifact = GeneratedArtifact::new(
            "swot_analysis",
            "SWOT Analysis",
            "<p>body</p>".to_string(),
            Utc::now(),
        );
        let entry = persister.persist("job-1", &submission(), &artifact).unwrap();

        assert_eq!(entry.report_type, "swot_analysis");
        assert_eq!(entry.size_metric, 1);
        assert!(temp_dir.path().join("job-1/swot_analysis.html").exists());

        let rows = report_repo::list_by_job(&db, "job-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "completed");
        assert!(rows[0].content.contains("<p>body</p>"));
    }

    #[test]
    fn test_persist_twice_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let persister =
            ArtifactPersister::with_report_rows(ArtifactStore::new(temp_dir.path()), db.clone());

        let first = GeneratedArtifact::new("a", "A", "one".to_string(), Utc::now());
        let second = GeneratedArtifact::new("a", "A", "two".to_string(), Utc::now());
        persister.persist("job-1", &submission(), &first).unwrap();
        persister.persist("job-1", &submission(), &second).unwrap();

        let rows = report_repo::list_by_job(&db, "job-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].content.contains("two"));
        let file = std::fs::read_to_string(temp_dir.path().join("job-1/a.html")).unwrap();
        assert!(file.contains("two"));
    }

    #[test]
    fn test_persist_without_rows() {
        let temp_dir = TempDir::new().unwrap();
        let persister = ArtifactPersister::new(ArtifactStore::new(temp_dir.path()));
        let artifact = GeneratedArtifact::new("a", "A", "x".to_string(), Utc::now());

        persister.persist("job-1", &submission(), &artifact).unwrap();
        assert!(persister.store().artifact_path("job-1", "a").exists());
    }

    #[test]
    fn test_row_failure_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE reports;")?;
            Ok(())
        })
        .unwrap();
        let persister =
            ArtifactPersister::with_report_rows(ArtifactStore::new(temp_dir.path()), db);
        let artifact = GeneratedArtifact::new("a", "A", "x".to_string(), Utc::now());

        let result = persister.persist("job-1", &submission(), &artifact);

        assert!(matches!(result, Err(PersistenceError::Database(_))));
        assert!(!persister.store().artifact_path("job-1", "a").exists());
    }
}
