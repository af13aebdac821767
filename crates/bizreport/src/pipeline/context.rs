use std::time::Duration;

use crate::config::{PipelineVariant, ReportSpec};
use crate::db::submission_repo::SubmissionRow;
use crate::storage::{Manifest, ManifestEntry, ResourceUsage};
use crate::worker::job::Job;

use super::error::StageError;

/// Result of one report stage.
#[derive(Debug)]
pub struct StageOutcome {
    pub spec: ReportSpec,
    pub result: Result<ManifestEntry, StageError>,
    pub elapsed: Duration,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

pub struct PipelineContext {
    // Input
    pub job: Job,
    pub variant: PipelineVariant,

    // Resolved before the first stage
    pub submission: Option<SubmissionRow>,

    // One entry per stage that ran, in catalog order
    pub outcomes: Vec<StageOutcome>,

    // Set once every stage has run and the manifest is on disk
    pub manifest: Option<Manifest>,
}

impl PipelineContext {
    pub fn new(job: Job, variant: PipelineVariant) -> Self {
        Self {
            job,
            variant,
            submission: None,
            outcomes: Vec::new(),
            manifest: None,
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&ReportSpec, &StageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.spec, e)))
    }

    pub fn resource_usage(&self) -> ResourceUsage {
        self.outcomes
            .iter()
            .fold(ResourceUsage::default(), |mut usage, o| {
                usage.prompt_tokens += o.prompt_tokens;
                usage.completion_tokens += o.completion_tokens;
                usage.generation_millis += o.elapsed.as_millis() as u64;
                if o.result.is_err() {
                    usage.failed_stages += 1;
                }
                usage
            })
    }
}
