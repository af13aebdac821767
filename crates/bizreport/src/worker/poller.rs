//! The poll loop: find the oldest pending job, claim it, run it to a
//! terminal state, repeat. One job is in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::broadcast::JobProgressBroadcaster;
use crate::db::{job_repo, DatabaseError};
use crate::pipeline::{Pipeline, ProgressEvent, ProgressReporter, ProgressTracker};

use super::job::{Job, JobResult};
use super::shutdown::ShutdownSignal;
use super::state::{JobStateMachine, TransitionError};

/// The store could not be read or written during a poll cycle. The cycle is
/// skipped and no job changes state.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Job store unavailable: {0}")]
    Store(#[from] DatabaseError),
}

#[derive(Debug)]
pub enum PollOutcome {
    /// Nothing pending, or shutdown already requested.
    Idle,
    /// Another worker claimed the job first.
    Contended { job_id: String },
    /// The job's stored record could not be read. It was failed without
    /// running the pipeline.
    Invalid { job_id: String, error: String },
    /// A job was claimed and driven to a terminal state.
    Processed(JobResult),
}

pub struct JobPoller {
    state: JobStateMachine,
    pipeline: Arc<Pipeline>,
    broadcaster: Option<JobProgressBroadcaster>,
    poll_interval: Duration,
    shutdown: ShutdownSignal,
}

impl JobPoller {
    pub fn new(
        state: JobStateMachine,
        pipeline: Arc<Pipeline>,
        poll_interval: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            state,
            pipeline,
            broadcaster: None,
            poll_interval,
            shutdown,
        }
    }

    /// Publish progress for every job this poller runs.
    pub fn with_broadcaster(mut self, broadcaster: JobProgressBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Polls on a fixed interval until shutdown. The first cycle runs
    /// immediately. A failed cycle is logged and the loop keeps going.
    pub async fn run(&self) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Job poller started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.wait() => break,
            }
            if self.shutdown.is_requested() {
                break;
            }

            match self.poll_once().await {
                Ok(PollOutcome::Idle) => debug!("No pending jobs"),
                Ok(PollOutcome::Contended { job_id }) => {
                    debug!(job_id = %job_id, "Job claimed by another worker")
                }
                Ok(PollOutcome::Invalid { .. }) => {}
                Ok(PollOutcome::Processed(result)) => debug!(
                    job_id = %result.job_id,
                    success = result.success,
                    "Poll cycle finished a job"
                ),
                Err(e) => error!(error = %e, "Poll cycle failed"),
            }
        }

        info!("Job poller stopped");
    }

    /// One poll cycle.
    pub async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        if self.shutdown.is_requested() {
            return Ok(PollOutcome::Idle);
        }

        let Some(candidate) = job_repo::find_oldest_pending(self.state.database())? else {
            return Ok(PollOutcome::Idle);
        };

        let job = match self.state.claim(&candidate.id) {
            Ok(job) => job,
            Err(TransitionError::Database(e)) => return Err(PollError::Store(e)),
            Err(TransitionError::Invalid { job_id, source }) => {
                warn!(job_id = %job_id, error = %source, "Claimed job has an invalid record, failed it");
                return Ok(PollOutcome::Invalid {
                    job_id,
                    error: source.to_string(),
                });
            }
            Err(e) => {
                debug!(job_id = %candidate.id, reason = %e, "Claim lost");
                return Ok(PollOutcome::Contended {
                    job_id: candidate.id,
                });
            }
        };

        info!(job_id = %job.id, submission_ref = %job.submission_ref, "Job claimed");
        Ok(PollOutcome::Processed(self.process(job).await))
    }

    async fn process(&self, job: Job) -> JobResult {
        let tracker = ProgressTracker::new(
            &job.id,
            self.state.database().clone(),
            self.broadcaster.clone(),
        );
        tracker.report(ProgressEvent::Started);

        let (result, ctx) = self.pipeline.run(job, &tracker).await;

        if result.success {
            match self.state.complete(&result.job_id) {
                Ok(()) => {
                    let failed: Vec<&str> =
                        ctx.failed().map(|(spec, _)| spec.report_type.as_str()).collect();
                    info!(
                        job_id = %result.job_id,
                        artifacts = result.artifacts,
                        failed = ?failed,
                        "Job completed"
                    );
                    tracker.report(ProgressEvent::Completed {
                        artifacts: result.artifacts,
                    });
                }
                Err(e) => error!(job_id = %result.job_id, error = %e, "Could not mark job completed"),
            }
        } else {
            let message = result.error.as_deref().unwrap_or("unknown error");
            warn!(job_id = %result.job_id, error = %message, "Job failed");
            match self.state.fail(&result.job_id, message) {
                Ok(()) => tracker.report(ProgressEvent::Failed {
                    error: message.to_string(),
                }),
                Err(e) => error!(job_id = %result.job_id, error = %e, "Could not mark job failed"),
            }
        }

        result
    }
}
