use std::sync::atomic::{AtomicU8, Ordering};

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::db::{job_repo, Database};

/// Highest progress stored while a job is still processing. 100 is written
/// only by the completion transition.
pub const MAX_PROGRESS_WHILE_PROCESSING: u8 = 99;

/// Events emitted by the pipeline and the poller during one job.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    Stage {
        index: usize,
        total: usize,
        progress: u8,
        title: String,
    },
    Completed {
        artifacts: usize,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// `round((index + 1) / total * 100)`, in integers.
pub fn stage_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = (index + 1).min(total);
    ((done * 200 + total) / (2 * total)) as u8
}

/// Writes stage progress to the job row and republishes it to subscribers.
///
/// Store errors are logged and swallowed; a missed progress write must not
/// fail the job.
pub struct ProgressTracker {
    job_id: String,
    db: Database,
    broadcaster: Option<JobProgressBroadcaster>,
    stored: AtomicU8,
}

impl ProgressTracker {
    pub fn new(job_id: &str, db: Database, broadcaster: Option<JobProgressBroadcaster>) -> Self {
        Self {
            job_id: job_id.to_string(),
            db,
            broadcaster,
            stored: AtomicU8::new(0),
        }
    }

    /// Last progress value this tracker wrote.
    pub fn stored_progress(&self) -> u8 {
        self.stored.load(Ordering::Acquire)
    }

    fn publish(&self, event: JobProgressEvent) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.send(event);
        }
    }
}

impl ProgressReporter for ProgressTracker {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started => {
                self.publish(JobProgressEvent::started(&self.job_id));
            }
            ProgressEvent::Stage {
                progress, title, ..
            } => {
                let clamped = progress.min(MAX_PROGRESS_WHILE_PROCESSING);
                let previous = self.stored.fetch_max(clamped, Ordering::AcqRel);
                let value = previous.max(clamped);

                match job_repo::update_progress(&self.db, &self.job_id, value, &title) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(
                        job_id = %self.job_id,
                        "Progress not recorded: job is no longer processing"
                    ),
                    Err(e) => tracing::warn!(
                        job_id = %self.job_id,
                        error = %e,
                        "Progress write failed"
                    ),
                }

                self.publish(JobProgressEvent::stage(&self.job_id, value, &title));
            }
            ProgressEvent::Completed { artifacts } => {
                self.stored.store(100, Ordering::Release);
                self.publish(JobProgressEvent::completed(&self.job_id, artifacts));
            }
            ProgressEvent::Failed { error } => {
                self.publish(JobProgressEvent::failed(
                    &self.job_id,
                    self.stored_progress(),
                    &error,
                ));
            }
        }
    }
}
