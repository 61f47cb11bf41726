//! Concurrency and failure-handling guarantees of the import processor

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{csv, Harness, API_KEY};
use reelimport_core::application::{ImportOptions, RunOutcome, RunRequest, RunScope};
use reelimport_core::domain::{JobStatus, Page, RowErrorCode, RowStatus};
use reelimport_core::port::record_service::mocks::{MockBehavior, MockRecordService};
use reelimport_core::port::title_catalog::mocks::MockTitleCatalog;
use reelimport_infra_memory::MemoryJobStore;

fn three_rows() -> String {
    csv(&[
        "2024-01-01,Heat,1995,https://boxd.it/1",
        "2024-01-01,Alien,1979,https://boxd.it/2",
        "2024-01-01,Ran,1985,https://boxd.it/3",
    ])
}

fn run_request(job_id: &str) -> RunRequest {
    RunRequest {
        job_id: job_id.to_string(),
        credential: API_KEY.to_string(),
        options: ImportOptions::default(),
        scope: RunScope::Pending,
    }
}

#[tokio::test]
async fn test_second_trigger_while_running_is_ignored() {
    let h = Harness::memory(MockRecordService::new_success().with_delay(Duration::from_millis(50)));
    let created = h
        .service
        .create_import(h.request(&three_rows(), ImportOptions::default()))
        .await
        .unwrap();

    let outcome = h
        .service
        .processor()
        .run(run_request(&created.id))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::AlreadyRunning);

    let summary = h.wait_finished(&created.id).await;
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(h.records.call_count(), 3);

    let job = h.job(&created.id).await;
    assert!(job.rows.iter().all(|r| r.attempt_count == 1));

    // A finished job is not picked up again
    let outcome = h
        .service
        .processor()
        .run(run_request(&created.id))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::NotQueued(JobStatus::Completed));
    assert_eq!(h.records.call_count(), 3);
}

#[tokio::test]
async fn test_run_for_unknown_job_reports_not_found() {
    let h = Harness::memory(MockRecordService::new_success());
    let outcome = h
        .service
        .processor()
        .run(run_request("missing"))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::NotFound);
    assert!(h.service.processor().in_flight().is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_process_each_row_once() {
    let h = Harness::memory(MockRecordService::new_success().with_delay(Duration::from_millis(20)));
    let created = h
        .service
        .create_import(h.request(&three_rows(), ImportOptions::default()))
        .await
        .unwrap();

    let processor = Arc::clone(h.service.processor());
    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let request = run_request(&created.id);
            tokio::spawn(async move { processor.run(request).await })
        })
        .collect();
    for attempt in attempts {
        let outcome = attempt.await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::AlreadyRunning | RunOutcome::NotQueued(_)
        ));
    }

    h.wait_finished(&created.id).await;
    assert_eq!(h.records.call_count(), 3);
}

#[tokio::test]
async fn test_retry_during_pass_is_a_no_op() {
    let h = Harness::memory(MockRecordService::new_success().with_delay(Duration::from_millis(50)));
    let created = h
        .service
        .create_import(h.request(&three_rows(), ImportOptions::default()))
        .await
        .unwrap();

    let summary = h
        .service
        .retry_failed_rows(&created.id, API_KEY, ImportOptions::default())
        .await
        .unwrap();
    assert!(!summary.status.is_terminal());

    let done = h.wait_finished(&created.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.records.call_count(), 3);
}

#[tokio::test]
async fn test_progress_is_visible_mid_pass() {
    let h = Harness::memory(MockRecordService::new_success().with_delay(Duration::from_millis(100)));
    let created = h
        .service
        .create_import(h.request(&three_rows(), ImportOptions::default()))
        .await
        .unwrap();

    let mut saw_partial_progress = false;
    for _ in 0..100 {
        let summary = h.service.get_job(&created.id).await.unwrap();
        if summary.status == JobStatus::Processing
            && summary.counters.processed_rows > 0
            && summary.counters.processed_rows < 3
        {
            saw_partial_progress = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saw_partial_progress);

    let done = h.wait_finished(&created.id).await;
    assert_eq!(done.counters.processed_rows, 3);
}

#[tokio::test]
async fn test_row_in_flight_is_persisted_as_processing() {
    let h = Harness::memory(MockRecordService::new_success().with_delay(Duration::from_millis(400)));
    let created = h
        .service
        .create_import(h.request(
            &csv(&["2024-01-01,Heat,1995,https://boxd.it/1"]),
            ImportOptions::default(),
        ))
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while h.records.call_count() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "record service never called");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let rows = h
        .service
        .get_job_rows(&created.id, None, Page::rows(None, None))
        .await
        .unwrap();
    assert_eq!(rows.rows[0].status, RowStatus::Processing);
    assert_eq!(rows.rows[0].attempt_count, 1);

    let done = h.wait_finished(&created.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    let job = h.job(&created.id).await;
    assert_eq!(job.rows[0].status, RowStatus::Success);
    assert_eq!(job.rows[0].attempt_count, 1);
}

#[tokio::test]
async fn test_panic_finalizes_job_and_releases_claim() {
    let records = MockRecordService::new_success()
        .with_title("Alien", MockBehavior::Panic("downstream exploded".to_string()));
    let h = Harness::memory(records);

    let summary = h.import(&three_rows(), ImportOptions::default()).await;

    assert_eq!(summary.status, JobStatus::Partial);
    assert_eq!(summary.counters.success_rows, 1);
    assert_eq!(summary.counters.failed_rows, 2);
    assert!(h.service.processor().in_flight().is_empty());

    let job = h.job(&summary.id).await;
    assert_eq!(job.rows[0].status, RowStatus::Success);
    for row in &job.rows[1..] {
        assert_eq!(row.status, RowStatus::Failed);
        assert_eq!(row.error_code, Some(RowErrorCode::Interrupted));
    }

    // Interrupted rows are retryable once the downstream recovers
    h.records
        .set_title("Alien", MockBehavior::Create(Some("record-2".to_string())));
    h.service
        .retry_failed_rows(&summary.id, API_KEY, ImportOptions::default())
        .await
        .unwrap();
    let done = h.wait_finished(&summary.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.success_rows, 3);
}

#[tokio::test]
async fn test_jobs_run_independently() {
    let records = MockRecordService::new_success()
        .with_title("Slow", MockBehavior::Create(Some("slow-1".to_string())))
        .with_delay(Duration::from_millis(30));
    let h = Harness::build(
        Arc::new(MemoryJobStore::new()),
        records,
        MockTitleCatalog::with_titles(Vec::<String>::new()),
        false,
    );

    let a = h
        .service
        .create_import(h.request(&three_rows(), ImportOptions::default()))
        .await
        .unwrap();
    let b = h
        .service
        .create_import(h.request(
            &csv(&["2024-01-01,Slow,2001,https://boxd.it/9"]),
            ImportOptions::default(),
        ))
        .await
        .unwrap();
    assert_ne!(a.id, b.id);

    let (a_done, b_done) = tokio::join!(h.wait_finished(&a.id), h.wait_finished(&b.id));
    assert_eq!(a_done.status, JobStatus::Completed);
    assert_eq!(b_done.status, JobStatus::Completed);
    assert_eq!(h.records.call_count(), 4);
}
