//! Shared wiring for end-to-end tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reelimport_core::application::{
    BulkImportService, CreateImportRequest, ImportOptions, ImportProcessor, ProcessorConfig,
};
use reelimport_core::domain::{ImportJob, ImportProfile, JobSummary};
use reelimport_core::port::id_provider::mocks::SequentialIdProvider;
use reelimport_core::port::record_service::mocks::MockRecordService;
use reelimport_core::port::time_provider::mocks::FixedTimeProvider;
use reelimport_core::port::title_catalog::mocks::MockTitleCatalog;
use reelimport_core::port::JobStore;
use reelimport_infra_memory::MemoryJobStore;

pub const HEADER: &str = "Date,Name,Year,Letterboxd URI";
pub const API_KEY: &str = "test-api-key";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

/// CSV text from data lines under the standard header
pub fn csv(lines: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for line in lines {
        out.push('\n');
        out.push_str(line);
    }
    out.push('\n');
    out
}

pub struct Harness {
    pub store: Arc<dyn JobStore>,
    pub records: Arc<MockRecordService>,
    pub catalog: Arc<MockTitleCatalog>,
    pub time: Arc<FixedTimeProvider>,
    pub service: Arc<BulkImportService>,
}

impl Harness {
    pub fn memory(records: MockRecordService) -> Self {
        Self::build(
            Arc::new(MemoryJobStore::new()),
            records,
            MockTitleCatalog::with_titles(Vec::<String>::new()),
            false,
        )
    }

    pub fn build(
        store: Arc<dyn JobStore>,
        records: MockRecordService,
        catalog: MockTitleCatalog,
        remote_dedupe: bool,
    ) -> Self {
        let records = Arc::new(records);
        let catalog = Arc::new(catalog);
        let time = Arc::new(FixedTimeProvider::at_date(today()));
        let processor = Arc::new(ImportProcessor::new(
            store.clone(),
            records.clone(),
            catalog.clone(),
            time.clone(),
            ImportProfile::letterboxd_movies(),
            ProcessorConfig {
                remote_dedupe,
                rng_seed: Some(7),
            },
        ));
        let service = Arc::new(BulkImportService::new(
            store.clone(),
            processor,
            Arc::new(SequentialIdProvider::new("job")),
            time.clone(),
        ));
        Self {
            store,
            records,
            catalog,
            time,
            service,
        }
    }

    pub fn request(&self, content: &str, options: ImportOptions) -> CreateImportRequest {
        CreateImportRequest {
            file_name: "watched.csv".to_string(),
            content: content.as_bytes().to_vec(),
            credential: API_KEY.to_string(),
            options,
            source: None,
        }
    }

    /// Create a job and wait for its first pass to finish
    pub async fn import(&self, content: &str, options: ImportOptions) -> JobSummary {
        let created = self
            .service
            .create_import(self.request(content, options))
            .await
            .expect("create_import failed");
        self.wait_finished(&created.id).await
    }

    /// Poll until the job is terminal and no pass holds it
    pub async fn wait_finished(&self, job_id: &str) -> JobSummary {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let summary = self.service.get_job(job_id).await.expect("get_job failed");
            let running = self.service.processor().in_flight().contains(job_id);
            if summary.status.is_terminal() && !running {
                return summary;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {} did not finish (status {})",
                job_id,
                summary.status
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn job(&self, job_id: &str) -> ImportJob {
        self.store
            .get(&job_id.to_string())
            .await
            .expect("store get failed")
            .expect("job missing")
    }
}
