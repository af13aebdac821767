use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ReportSpec;
use crate::db::submission_repo::{self, SubmissionRow};
use crate::db::Database;
use crate::generator::{build_request, ContentGenerator};
use crate::storage::{ArtifactPersister, ArtifactStore, GeneratedArtifact, ManifestBuilder};
use crate::worker::job::{Job, JobResult};
use crate::worker::shutdown::ShutdownSignal;

use super::config::PipelineConfig;
use super::context::{PipelineContext, StageOutcome};
use super::error::{FatalJobError, StageError};
use super::progress::{stage_progress, ProgressEvent, ProgressReporter};

/// Runs every report stage of one claimed job, in catalog order.
///
/// A stage failure is recorded and the next stage runs. Only a missing
/// submission, an unusable output directory or a shutdown request end the
/// job.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    db: Database,
    generator: Arc<dyn ContentGenerator>,
    persister: ArtifactPersister,
    shutdown: ShutdownSignal,
}

impl Pipeline {
    /// Production constructor. Builds the persister from config.
    pub fn from_config(
        config: Arc<PipelineConfig>,
        db: Database,
        generator: Arc<dyn ContentGenerator>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let store = ArtifactStore::new(&config.output_directory);
        let persister = if config.write_report_rows {
            ArtifactPersister::with_report_rows(store, db.clone())
        } else {
            ArtifactPersister::new(store)
        };
        Self::new(config, db, generator, persister, shutdown)
    }

    /// Inject a specific persister.
    pub fn new(
        config: Arc<PipelineConfig>,
        db: Database,
        generator: Arc<dyn ContentGenerator>,
        persister: ArtifactPersister,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            config,
            db,
            generator,
            persister,
            shutdown,
        }
    }

    pub fn persister(&self) -> &ArtifactPersister {
        &self.persister
    }

    /// Run all stages for a claimed job.
    /// Returns a (JobResult, PipelineContext) pair; the caller applies the
    /// terminal transition.
    pub async fn run(&self, job: Job, progress: &dyn ProgressReporter) -> (JobResult, PipelineContext) {
        let variant = job.pipeline.unwrap_or(self.config.default_variant);
        let span = info_span!("pipeline",
            job_id = %job.id,
            submission_ref = %job.submission_ref,
            pipeline = %variant,
        );
        let ctx = PipelineContext::new(job, variant);

        let (outcome, ctx) = self.run_inner(ctx, progress).instrument(span).await;
        match outcome {
            Ok(()) => {
                let artifacts = ctx.manifest.as_ref().map_or(0, |m| m.total_artifacts);
                let failed = ctx.failed().count();
                (JobResult::success(&ctx.job, artifacts, failed), ctx)
            }
            Err(e) => (JobResult::failure(&ctx.job, e.to_string()), ctx),
        }
    }

    async fn run_inner(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (Result<(), FatalJobError>, PipelineContext) {
        // Resolve input before any stage runs
        let submission = match submission_repo::find_by_ref(&self.db, &ctx.job.submission_ref) {
            Ok(Some(submission)) => submission,
            Ok(None) => {
                let err = FatalJobError::SubmissionNotFound(ctx.job.submission_ref.clone());
                return (Err(err), ctx);
            }
            Err(e) => return (Err(FatalJobError::SubmissionLookup(e)), ctx),
        };

        // Nothing is generated for a job whose artifacts cannot be stored
        if let Err(e) = self.persister.store().prepare_job_directory(&ctx.job.id) {
            ctx.submission = Some(submission);
            return (Err(FatalJobError::OutputUnavailable(e)), ctx);
        }

        let specs = self.config.specs_for(ctx.variant);
        let total = specs.len();
        info!(stages = total, "Pipeline started");

        for (index, spec) in specs.iter().enumerate() {
            if self.shutdown.is_requested() {
                warn!(completed_stages = index, "Shutdown requested, abandoning job");
                ctx.submission = Some(submission);
                return (Err(FatalJobError::Interrupted), ctx);
            }

            progress.report(ProgressEvent::Stage {
                index,
                total,
                progress: stage_progress(index, total),
                title: spec.title.clone(),
            });

            let stage_span = info_span!("stage", report_type = %spec.report_type, index = index as u64);
            let outcome = self
                .run_stage(&ctx.job.id, &submission, spec)
                .instrument(stage_span)
                .await;
            ctx.outcomes.push(outcome);

            if index + 1 < total && !self.config.stage_delay.is_zero() {
                tokio::time::sleep(self.config.stage_delay).await;
            }
        }

        let mut builder = ManifestBuilder::new();
        for entry in ctx.succeeded() {
            builder.push(entry.clone());
        }
        let manifest = builder.build(
            &ctx.job.id,
            &ctx.job.submission_ref,
            ctx.variant.as_str(),
            ctx.resource_usage(),
            Utc::now(),
        );

        if let Err(e) = self.persister.write_manifest(&manifest) {
            error!(error = %e, "Manifest write failed, completing job without it");
        }

        info!(
            artifacts = manifest.total_artifacts,
            failed_stages = manifest.resource_usage.failed_stages,
            pages = manifest.total_size,
            "Pipeline finished"
        );
        ctx.manifest = Some(manifest);
        ctx.submission = Some(submission);
        (Ok(()), ctx)
    }

    async fn run_stage(
        &self,
        job_id: &str,
        submission: &SubmissionRow,
        spec: &ReportSpec,
    ) -> StageOutcome {
        let request = build_request(spec, submission);
        let started = Instant::now();
        let generated = self.generator.generate(&request).await;
        let elapsed = started.elapsed();

        let (result, prompt_tokens, completion_tokens) = match generated {
            Ok(content) => {
                let tokens = (content.prompt_tokens, content.completion_tokens);
                let artifact =
                    GeneratedArtifact::new(&spec.report_type, &spec.title, content.body, Utc::now());
                let persisted = self
                    .persister
                    .persist(job_id, submission, &artifact)
                    .map_err(StageError::from);
                (persisted, tokens.0, tokens.1)
            }
            Err(e) => (Err(StageError::from(e)), 0, 0),
        };

        match &result {
            Ok(entry) => debug!(
                pages = entry.size_metric,
                elapsed_ms = elapsed.as_millis() as u64,
                "Stage succeeded"
            ),
            Err(e) => warn!(error = %e, "Stage failed, continuing with next report"),
        }

        StageOutcome {
            spec: spec.clone(),
            result,
            elapsed,
            prompt_tokens,
            completion_tokens,
        }
    }
}
