//! Queue-level behaviour: claiming, ordering, terminal states and recovery.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bizreport::db::job_repo;
use bizreport::worker::state::ABANDONED_MESSAGE;
use bizreport::worker::{PollError, PollOutcome, TransitionError};
use bizreport::{JobStateMachine, JobStatus};

use common::harness::three_reports;
use common::{FakeGenerator, TestHarness};

#[tokio::test]
async fn test_empty_queue_is_idle() {
    let harness = TestHarness::new();
    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator.clone(), three_reports()));

    let outcome = poller.poll_once().await.unwrap();

    assert!(matches!(outcome, PollOutcome::Idle));
    assert!(generator.calls().is_empty());
    assert_eq!(std::fs::read_dir(&harness.output_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_oldest_pending_job_runs_first() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-old");
    harness.seed_submission("sub-new");
    harness.enqueue_at("job-new", "sub-new", "2026-02-01T10:00:05.000000Z");
    harness.enqueue_at("job-old", "sub-old", "2026-02-01T10:00:00.000000Z");

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator, three_reports()));

    match poller.poll_once().await.unwrap() {
        PollOutcome::Processed(result) => assert_eq!(result.job_id, "job-old"),
        other => panic!("expected a processed job, got {:?}", other),
    }
    assert_eq!(harness.job("job-new").status, "pending");

    match poller.poll_once().await.unwrap() {
        PollOutcome::Processed(result) => assert_eq!(result.job_id, "job-new"),
        other => panic!("expected a processed job, got {:?}", other),
    }
    assert!(matches!(poller.poll_once().await.unwrap(), PollOutcome::Idle));
}

#[tokio::test]
async fn test_shutdown_requested_before_poll_claims_nothing() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-1");
    let job = harness.enqueue("sub-1");
    harness.shutdown.request();

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator, three_reports()));

    assert!(matches!(poller.poll_once().await.unwrap(), PollOutcome::Idle));
    assert_eq!(harness.job(&job.id).status, "pending");
}

#[test]
fn test_only_one_worker_wins_a_claim() {
    let harness = TestHarness::new();
    let job = harness.enqueue("sub-1");

    let handles = [harness.db.clone(), harness.open_second_handle()];
    let outcomes: Vec<bool> = std::thread::scope(|scope| {
        let workers: Vec<_> = handles
            .iter()
            .map(|db| {
                let id = job.id.clone();
                scope.spawn(move || JobStateMachine::new(db.clone()).claim(&id).is_ok())
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|won| **won).count(), 1);
    assert_eq!(harness.job(&job.id).status, "processing");
}

#[test]
fn test_losing_claim_reports_current_state() {
    let harness = TestHarness::new();
    let job = harness.enqueue("sub-1");

    let first = JobStateMachine::new(harness.db.clone());
    let second = JobStateMachine::new(harness.open_second_handle());

    first.claim(&job.id).unwrap();
    match second.claim(&job.id) {
        Err(TransitionError::Rejected { from, to, .. }) => {
            assert_eq!(from, JobStatus::Processing);
            assert_eq!(to, JobStatus::Processing);
        }
        other => panic!("expected rejected claim, got {:?}", other.map(|j| j.id)),
    }
}

#[tokio::test]
async fn test_terminal_jobs_are_immutable() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-1");
    let job = harness.enqueue("sub-1");

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator, three_reports()));
    poller.poll_once().await.unwrap();

    let state = JobStateMachine::new(harness.db.clone());
    assert!(state.fail(&job.id, "late failure").is_err());
    assert!(state.claim(&job.id).is_err());
    assert!(!job_repo::update_progress(&harness.db, &job.id, 5, "late").unwrap());

    let row = harness.job(&job.id);
    assert_eq!(row.status, "completed");
    assert_eq!(row.progress, 100);
    assert!(row.error_message.is_none());
}

#[tokio::test]
async fn test_store_error_fails_cycle_without_panicking() {
    let harness = TestHarness::new();
    harness
        .db
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE jobs;")?;
            Ok(())
        })
        .unwrap();

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator.clone(), three_reports()));

    assert!(matches!(poller.poll_once().await, Err(PollError::Store(_))));

    // The loop logs the failure and keeps polling until shutdown
    let shutdown = harness.shutdown.clone();
    let running = tokio::spawn(async move { poller.run().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("poller did not stop")
        .expect("poller panicked");
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_run_drains_queue_then_stops_on_shutdown() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-1");
    harness.seed_submission("sub-2");
    let first = harness.enqueue_at("job-1", "sub-1", "2026-02-01T10:00:00.000000Z");
    let second = harness.enqueue_at("job-2", "sub-2", "2026-02-01T10:00:01.000000Z");

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator.clone(), three_reports()));

    let shutdown = harness.shutdown.clone();
    let running = tokio::spawn(async move { poller.run().await });

    let mut waited = Duration::ZERO;
    while job_repo::count_by_status(&harness.db, "completed").unwrap() < 2 {
        assert!(waited < Duration::from_secs(5), "queue not drained");
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    shutdown.request();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("poller did not stop")
        .expect("poller panicked");

    assert_eq!(harness.job(&first.id).status, "completed");
    assert_eq!(harness.job(&second.id).status, "completed");
    assert_eq!(generator.calls().len(), 6);
}

#[tokio::test]
async fn test_unreadable_timestamp_fails_job_and_queue_moves_on() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-1");
    harness.enqueue_at("job-ext", "sub-1", "2026-01-01 00:00:00");
    let valid = harness.enqueue_at("job-ok", "sub-1", "2026-02-01T10:00:00.000000Z");

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator.clone(), three_reports()));

    match poller.poll_once().await.unwrap() {
        PollOutcome::Invalid { job_id, error } => {
            assert_eq!(job_id, "job-ext");
            assert!(error.contains("2026-01-01 00:00:00"), "{}", error);
        }
        other => panic!("expected an invalid job, got {:?}", other),
    }
    assert!(generator.calls().is_empty());

    let row = harness.job("job-ext");
    assert_eq!(row.status, "failed");
    assert!(row.error_message.unwrap().starts_with("Invalid job record"));
    assert!(row.completed_at.is_some());

    match poller.poll_once().await.unwrap() {
        PollOutcome::Processed(result) => assert_eq!(result.job_id, valid.id),
        other => panic!("expected a processed job, got {:?}", other),
    }
    assert_eq!(harness.job(&valid.id).status, "completed");
    assert!(matches!(poller.poll_once().await.unwrap(), PollOutcome::Idle));
}

#[tokio::test]
async fn test_unknown_pipeline_fails_job_without_generation() {
    let harness = TestHarness::new();
    harness.seed_submission("sub-1");
    let job = job_repo::enqueue(&harness.db, "sub-1", Some("premium")).unwrap();

    let generator = Arc::new(FakeGenerator::new());
    let poller = harness.poller(harness.pipeline(generator.clone(), three_reports()));

    assert!(matches!(
        poller.poll_once().await.unwrap(),
        PollOutcome::Invalid { .. }
    ));
    assert!(generator.calls().is_empty());

    let row = harness.job(&job.id);
    assert_eq!(row.status, "failed");
    assert!(row.error_message.unwrap().contains("premium"));
    assert_eq!(job_repo::count_by_status(&harness.db, "processing").unwrap(), 0);
    assert!(matches!(poller.poll_once().await.unwrap(), PollOutcome::Idle));
}

#[test]
fn test_stale_processing_jobs_fail_on_recovery() {
    let harness = TestHarness::new();
    let stale = harness.enqueue_at("job-stale", "sub-1", "2026-01-01T00:00:00.000000Z");
    job_repo::claim(&harness.db, &stale.id, "2026-01-01T00:00:01.000000Z").unwrap();

    let state = JobStateMachine::new(harness.db.clone());
    let fresh = harness.enqueue("sub-2");
    state.claim(&fresh.id).unwrap();
    let waiting = harness.enqueue("sub-3");

    let failed = state.fail_abandoned(Duration::from_secs(3600)).unwrap();

    assert_eq!(failed, vec!["job-stale".to_string()]);
    let row = harness.job("job-stale");
    assert_eq!(row.status, "failed");
    assert_eq!(row.error_message.as_deref(), Some(ABANDONED_MESSAGE));
    assert_eq!(harness.job(&fresh.id).status, "processing");
    assert_eq!(harness.job(&waiting.id).status, "pending");
}
