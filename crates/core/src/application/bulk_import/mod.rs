// Bulk Import Service - create, retry and query use cases

pub mod create;
pub mod query;
pub mod retry;


pub use create::CreateImportRequest;
pub use retry::RetryPlan;

use crate::application::processor::{ImportOptions, ImportProcessor, RunRequest, RunScope};
use crate::domain::{JobPage, JobSummary, Page, RowPage, RowStatus};
use crate::error::Result;
use crate::port::{IdProvider, JobStore, TimeProvider};
use std::sync::Arc;

/// Entry point used by the RPC layer
pub struct BulkImportService {
    store: Arc<dyn JobStore>,
    processor: Arc<ImportProcessor>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BulkImportService {
    pub fn new(
        store: Arc<dyn JobStore>,
        processor: Arc<ImportProcessor>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            processor,
            id_provider,
            time_provider,
        }
    }

    pub fn processor(&self) -> &Arc<ImportProcessor> {
        &self.processor
    }

    /// Create a queued job and schedule its first pass (not awaited)
    pub async fn create_import(&self, req: CreateImportRequest) -> Result<JobSummary> {
        let job = create::execute(
            self.store.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            self.processor.profile(),
            &req,
        )
        .await?;

        let summary = JobSummary::from_job(&job);
        self.processor.trigger(RunRequest {
            job_id: job.id,
            credential: req.credential,
            options: req.options,
            scope: RunScope::Pending,
        });
        Ok(summary)
    }

    /// Reset failed rows and schedule a pass restricted to them
    pub async fn retry_failed_rows(
        &self,
        job_id: &str,
        credential: &str,
        options: ImportOptions,
    ) -> Result<JobSummary> {
        let plan = retry::execute(
            self.store.as_ref(),
            self.time_provider.as_ref(),
            &self.processor,
            job_id,
        )
        .await?;

        match plan {
            RetryPlan::NoOp(summary) => Ok(summary),
            RetryPlan::Requeued {
                summary,
                rows,
                claim,
            } => {
                self.processor.spawn(
                    claim,
                    RunRequest {
                        job_id: summary.id.clone(),
                        credential: credential.to_string(),
                        options,
                        scope: RunScope::Rows(rows),
                    },
                );
                Ok(summary)
            }
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobSummary> {
        query::get_job(self.store.as_ref(), job_id).await
    }

    pub async fn get_job_rows(
        &self,
        job_id: &str,
        status: Option<RowStatus>,
        page: Page,
    ) -> Result<RowPage> {
        query::get_job_rows(self.store.as_ref(), job_id, status, page).await
    }

    pub async fn list_jobs(&self, page: Page) -> Result<JobPage> {
        query::list_jobs(self.store.as_ref(), page).await
    }
}
