// Job Store Port (Interface)

use crate::domain::{ImportJob, JobId, JobPage, JobStatus, Page, RowPage, RowStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence of jobs and their rows.
///
/// Implementations:
/// - SqliteJobStore: durable, transactional
/// - MemoryJobStore: in-process fallback (not crash-safe)
///
/// Both honor the same contracts: `save` is atomic over the header and every
/// row, rows are returned in row-number order, jobs newest-first.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Upsert a job and all of its rows atomically
    async fn save(&self, job: &ImportJob) -> Result<()>;

    /// Persist the header (status, counters, timestamps) together with one
    /// changed row. Defaults to a full `save`.
    async fn save_row(&self, job: &ImportJob, row_number: i64) -> Result<()> {
        let _ = row_number;
        self.save(job).await
    }

    /// Full job with rows ordered by row number
    async fn get(&self, job_id: &JobId) -> Result<Option<ImportJob>>;

    /// Filtered page of rows; `None` if the job does not exist
    async fn get_rows(
        &self,
        job_id: &JobId,
        status: Option<RowStatus>,
        page: Page,
    ) -> Result<Option<RowPage>>;

    /// Page of job summaries, newest first
    async fn list_jobs(&self, page: Page) -> Result<JobPage>;

    /// IDs of jobs currently in any of the given statuses (for recovery)
    async fn find_ids_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobId>>;
}
