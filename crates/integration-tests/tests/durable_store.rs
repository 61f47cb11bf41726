//! SQLite-backed flows: persistence across restarts, orphan recovery and a
//! full pass against an HTTP record service

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{csv, Harness, API_KEY};
use reelimport_core::application::{
    BulkImportService, CreateImportRequest, ImportOptions, ImportProcessor, ProcessorConfig,
    RecoveryService,
};
use reelimport_core::domain::{
    ImportJob, ImportProfile, ImportRow, ImportType, JobStatus, Page, RawPayload, RowErrorCode,
    RowOutcome, RowStatus,
};
use reelimport_core::port::id_provider::mocks::SequentialIdProvider;
use reelimport_core::port::record_service::mocks::MockRecordService;
use reelimport_core::port::time_provider::mocks::FixedTimeProvider;
use reelimport_core::port::title_catalog::mocks::MockTitleCatalog;
use reelimport_core::port::JobStore;
use reelimport_infra_http::{HttpClientConfig, HttpRecordService, HttpTitleCatalog};
use reelimport_infra_sqlite::{create_pool, database_url, run_migrations, SqliteJobStore};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn open_store(db: &Path) -> Arc<SqliteJobStore> {
    open_url(&database_url(db)).await
}

async fn open_url(url: &str) -> Arc<SqliteJobStore> {
    let pool = create_pool(url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteJobStore::new(pool))
}

fn raw(title: &str) -> RawPayload {
    [
        ("Date", "2024-01-01"),
        ("Name", title),
        ("Year", "1999"),
        ("Letterboxd URI", "https://boxd.it/x"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// A job as a crashed process would leave it: processing, one row done
fn half_processed_job(now: i64) -> ImportJob {
    let rows = ["Heat", "Alien", "Ran"]
        .iter()
        .enumerate()
        .map(|(i, title)| {
            ImportRow::new(format!("row-{i}"), "orphan-1", i as i64 + 2, raw(title), now)
        })
        .collect();
    let mut job = ImportJob::new(
        "orphan-1",
        now,
        ImportType::movies(),
        "letterboxd",
        "watched.csv",
        rows,
    );
    job.start(now).unwrap();
    job.rows[0].begin_attempt(now).unwrap();
    job.rows[0]
        .settle(
            RowOutcome::Success {
                target_record_id: Some("record-1".to_string()),
            },
            now,
        )
        .unwrap();
    job.rows[1].begin_attempt(now).unwrap();
    job.recompute_counters();
    job
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("jobs.db");

    let job_id = {
        let store = open_store(&db).await;
        let h = Harness::build(
            store,
            MockRecordService::new_success(),
            MockTitleCatalog::with_titles(Vec::<String>::new()),
            false,
        );
        let summary = h
            .import(
                &csv(&[
                    "2024-01-01,Heat,1995,https://boxd.it/1",
                    "2024-01-01,,1979,https://boxd.it/2",
                ]),
                ImportOptions::default(),
            )
            .await;
        assert_eq!(summary.status, JobStatus::Partial);
        summary.id
    };

    let store = open_store(&db).await;
    let job = store.get(&job_id).await.unwrap().expect("job persisted");
    assert_eq!(job.status, JobStatus::Partial);
    assert_eq!(job.rows.len(), 2);
    assert_eq!(job.rows[0].status, RowStatus::Success);
    assert!(job.rows[0].normalized_payload.is_some());
    assert_eq!(job.rows[1].error_code, Some(RowErrorCode::InvalidTitle));
    assert_eq!(job.rows[0].raw_payload.get("Name").map(String::as_str), Some("Heat"));

    let page = store.list_jobs(Page::jobs(None, None)).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.jobs[0].recent_errors.len(), 1);
}

#[tokio::test]
async fn test_orphaned_job_recovered_and_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("jobs.db");
    let now = 1_760_000_000_000;

    // Process 1 crashes mid-pass
    {
        let store = open_store(&db).await;
        store.save(&half_processed_job(now)).await.unwrap();
    }

    // Process 2 starts up
    let store = open_store(&db).await;
    let time = Arc::new(FixedTimeProvider::new(now + 60_000));
    let recovery = RecoveryService::new(store.clone(), time.clone());
    assert_eq!(recovery.recover_orphaned_jobs().await.unwrap(), 1);

    let job = store.get(&"orphan-1".to_string()).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Partial);
    assert_eq!(job.counters.success_rows, 1);
    assert_eq!(job.counters.failed_rows, 2);
    assert_eq!(job.completed_at, Some(now + 60_000));
    assert!(job.rows[1..]
        .iter()
        .all(|r| r.error_code == Some(RowErrorCode::Interrupted)));

    // Nothing left to recover
    assert_eq!(recovery.recover_orphaned_jobs().await.unwrap(), 0);

    let h = Harness::build(
        store,
        MockRecordService::new_success(),
        MockTitleCatalog::with_titles(Vec::<String>::new()),
        false,
    );
    h.service
        .retry_failed_rows("orphan-1", API_KEY, ImportOptions::default())
        .await
        .unwrap();
    let done = h.wait_finished("orphan-1").await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.records.call_count(), 2);
}

#[tokio::test]
async fn test_queued_job_without_pass_is_recovered() {
    let store = open_url("sqlite::memory:").await;
    let now = 1_760_000_000_000;
    let job = ImportJob::new(
        "queued-1",
        now,
        ImportType::movies(),
        "letterboxd",
        "watched.csv",
        vec![ImportRow::new("row-0", "queued-1", 2, raw("Heat"), now)],
    );
    store.save(&job).await.unwrap();

    let recovery = RecoveryService::new(store.clone(), Arc::new(FixedTimeProvider::new(now)));
    assert_eq!(recovery.recover_orphaned_jobs().await.unwrap(), 1);

    let job = store.get(&"queued-1".to_string()).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.rows[0].error_code, Some(RowErrorCode::Interrupted));
}

#[tokio::test]
async fn test_full_pass_against_http_record_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies"))
        .and(header("apiKey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "title": "Ran" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/movies"))
        .and(header("apiKey", API_KEY))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "m-1" })))
        .expect(2)
        .mount(&server)
        .await;

    let http = HttpClientConfig::new(server.uri(), Duration::from_secs(5));
    let store = open_url("sqlite::memory:").await;
    let time = Arc::new(FixedTimeProvider::at_date(common::today()));
    let processor = Arc::new(ImportProcessor::new(
        store.clone(),
        Arc::new(HttpRecordService::new(&http).unwrap()),
        Arc::new(HttpTitleCatalog::new(&http).unwrap()),
        time.clone(),
        ImportProfile::letterboxd_movies(),
        ProcessorConfig {
            remote_dedupe: true,
            rng_seed: Some(1),
        },
    ));
    let service = BulkImportService::new(
        store.clone(),
        processor.clone(),
        Arc::new(SequentialIdProvider::new("job")),
        time,
    );

    let created = service
        .create_import(CreateImportRequest {
            file_name: "watched.csv".to_string(),
            content: csv(&[
                "2024-01-01,Heat,1995,https://boxd.it/1",
                "2024-01-01,Alien,1979,https://boxd.it/2",
                "2024-01-01,Ran,1985,https://boxd.it/3",
            ])
            .into_bytes(),
            credential: API_KEY.to_string(),
            options: ImportOptions::default(),
            source: Some("letterboxd".to_string()),
        })
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let summary = loop {
        let summary = service.get_job(&created.id).await.unwrap();
        if summary.status.is_terminal() && !processor.in_flight().contains(&created.id) {
            break summary;
        }
        assert!(tokio::time::Instant::now() < deadline, "job did not finish");
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.counters.success_rows, 2);
    assert_eq!(summary.counters.skipped_rows, 1);

    let rows = service
        .get_job_rows(&created.id, Some(RowStatus::Success), Page::rows(None, None))
        .await
        .unwrap();
    assert!(rows
        .rows
        .iter()
        .all(|r| r.target_record_id.as_deref() == Some("m-1")));
}
