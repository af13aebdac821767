//! Job progress broadcaster for in-process progress streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::worker::state::JobStatus;

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub status: JobStatus,
    /// Stored progress, 0-100.
    pub progress: u8,
    /// Title of the report being generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<usize>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn started(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Processing,
            progress: 0,
            current_stage: None,
            timestamp: Utc::now(),
            artifacts: None,
            error: None,
        }
    }

    pub fn stage(job_id: &str, progress: u8, current_stage: &str) -> Self {
        Self {
            progress,
            current_stage: Some(current_stage.to_string()),
            ..Self::started(job_id)
        }
    }

    pub fn completed(job_id: &str, artifacts: usize) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: 100,
            artifacts: Some(artifacts),
            ..Self::started(job_id)
        }
    }

    pub fn failed(job_id: &str, progress: u8, error: &str) -> Self {
        Self {
            status: JobStatus::Failed,
            progress,
            error: Some(error.to_string()),
            ..Self::started(job_id)
        }
    }
}

/// Broadcasts job progress events to any number of subscribers.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
