// Query Use Cases (read-only)

use crate::domain::{JobPage, JobSummary, Page, RowPage, RowStatus};
use crate::error::{AppError, Result};
use crate::port::JobStore;

pub async fn get_job(store: &dyn JobStore, job_id: &str) -> Result<JobSummary> {
    store
        .get(&job_id.to_string())
        .await?
        .map(|job| JobSummary::from_job(&job))
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))
}

pub async fn get_job_rows(
    store: &dyn JobStore,
    job_id: &str,
    status: Option<RowStatus>,
    page: Page,
) -> Result<RowPage> {
    store
        .get_rows(&job_id.to_string(), status, page)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))
}

pub async fn list_jobs(store: &dyn JobStore, page: Page) -> Result<JobPage> {
    store.list_jobs(page).await
}
