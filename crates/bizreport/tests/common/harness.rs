//! Test harness for isolated worker runs.
//!
//! `TestHarness` owns a temporary directory holding a file-backed database
//! and the report output directory, plus helpers to seed submissions and
//! build pipelines and pollers with no stage delay.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use bizreport::config::{PipelineVariant, ReportSpec};
use bizreport::db::job_repo::{self, JobRow};
use bizreport::db::submission_repo::{self, SubmissionRow};
use bizreport::generator::ContentGenerator;
use bizreport::{Database, JobPoller, JobStateMachine, Pipeline, PipelineConfig, ShutdownSignal};

/// Test harness providing an isolated database and output directory.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Path to the SQLite file.
    pub db_path: PathBuf,
    /// Where artifacts and manifests land.
    pub output_dir: PathBuf,
    pub db: Database,
    pub shutdown: ShutdownSignal,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("bizreport.db");
        let output_dir = temp_dir.path().join("reports");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let db = Database::open(&db_path).expect("Failed to open database");

        Self {
            temp_dir,
            db_path,
            output_dir,
            db,
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A second handle on the same database file, as another worker would hold.
    pub fn open_second_handle(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to open second handle")
    }

    /// Stores a submission with one tagged and one untagged response.
    pub fn seed_submission(&self, submission_ref: &str) -> SubmissionRow {
        self.seed_submission_with(
            submission_ref,
            vec![
                json!({"topic": "FIN", "question": "Cash runway?", "answer": "9 months"}),
                json!({"question": "Biggest risk?", "answer": "Key supplier"}),
            ],
        )
    }

    pub fn seed_submission_with(&self, submission_ref: &str, responses: Vec<Value>) -> SubmissionRow {
        let submission = SubmissionRow {
            submission_ref: submission_ref.to_string(),
            user_id: "user-42".to_string(),
            company_profile: json!({"name": "Acme Bakery", "industry": "food", "employees": 14}),
            responses,
            created_at: "2026-02-01T09:00:00.000000Z".to_string(),
        };
        submission_repo::insert(&self.db, &submission).expect("Failed to insert submission");
        submission
    }

    pub fn enqueue(&self, submission_ref: &str) -> JobRow {
        job_repo::enqueue(&self.db, submission_ref, None).expect("Failed to enqueue job")
    }

    /// Enqueues with an explicit creation time, for ordering tests.
    pub fn enqueue_at(&self, id: &str, submission_ref: &str, created_at: &str) -> JobRow {
        let row = JobRow::pending(id, submission_ref, created_at);
        job_repo::insert(&self.db, &row).expect("Failed to insert job");
        row
    }

    pub fn job(&self, id: &str) -> JobRow {
        job_repo::find_by_id(&self.db, id)
            .expect("Failed to read job")
            .expect("Job not found")
    }

    pub fn pipeline_config(&self, reports: Option<Vec<ReportSpec>>) -> PipelineConfig {
        PipelineConfig {
            output_directory: self.output_dir.clone(),
            default_variant: PipelineVariant::Essentials,
            stage_delay: Duration::ZERO,
            write_report_rows: true,
            reports,
        }
    }

    /// Pipeline over a fixed report list.
    pub fn pipeline(
        &self,
        generator: Arc<dyn ContentGenerator>,
        reports: Vec<ReportSpec>,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::from_config(
            Arc::new(self.pipeline_config(Some(reports))),
            self.db.clone(),
            generator,
            self.shutdown.clone(),
        ))
    }

    pub fn poller(&self, pipeline: Arc<Pipeline>) -> JobPoller {
        JobPoller::new(
            JobStateMachine::new(self.db.clone()),
            pipeline,
            Duration::from_millis(10),
            self.shutdown.clone(),
        )
    }

    pub fn artifact_path(&self, job_id: &str, report_type: &str) -> PathBuf {
        self.output_dir.join(job_id).join(format!("{}.html", report_type))
    }

    pub fn manifest_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(job_id).join("manifest.json")
    }

    pub fn read_manifest(&self, job_id: &str) -> Value {
        let raw = std::fs::read_to_string(self.manifest_path(job_id)).expect("Failed to read manifest");
        serde_json::from_str(&raw).expect("Manifest is not JSON")
    }
}

/// Three reports: finance, operations, and an unfocused overview.
pub fn three_reports() -> Vec<ReportSpec> {
    vec![
        ReportSpec::new("finance", "Financial Health", &["FIN"], &["Cash", "Margins"]),
        ReportSpec::new("operations", "Operations Review", &["OPS"], &["Process"]),
        ReportSpec::new("overview", "Company Overview", &[], &["Summary"]),
    ]
}
