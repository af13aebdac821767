//! The per-job manifest: which artifacts a job actually produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of generated body per estimated printed page.
pub const CHARS_PER_PAGE: usize = 3000;

/// Estimated printed pages for a body. Never zero.
pub fn estimate_pages(body: &str) -> u32 {
    let chars = body.chars().count();
    chars.div_ceil(CHARS_PER_PAGE).max(1) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub report_type: String,
    pub title: String,
    /// Estimated pages.
    pub size_metric: u32,
    pub generated_at: DateTime<Utc>,
    /// File name relative to the job directory.
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub generation_millis: u64,
    pub failed_stages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub job_id: String,
    pub submission_ref: String,
    pub pipeline: String,
    pub artifacts: Vec<ManifestEntry>,
    pub total_artifacts: usize,
    pub total_size: u32,
    pub resource_usage: ResourceUsage,
    pub processed_at: DateTime<Utc>,
}

/// Accumulates entries in stage order. A second entry for a report type
/// replaces the first in place.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    entries: Vec<ManifestEntry>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.report_type == entry.report_type)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(
        self,
        job_id: &str,
        submission_ref: &str,
        pipeline: &str,
        resource_usage: ResourceUsage,
        processed_at: DateTime<Utc>,
    ) -> Manifest {
        let total_size = self.entries.iter().map(|e| e.size_metric).sum();
        Manifest {
            job_id: job_id.to_string(),
            submission_ref: submission_ref.to_string(),
            pipeline: pipeline.to_string(),
            total_artifacts: self.entries.len(),
            total_size,
            artifacts: self.entries,
            resource_usage,
            processed_at,
        }
    }
}
