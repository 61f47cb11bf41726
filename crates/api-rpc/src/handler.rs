//! RPC Method Handlers
//!
//! Thin translation between RPC parameters and `BulkImportService`.

use crate::error::to_rpc_error;
use crate::types::{CreateImportParams, GetJobParams, JobRowsParams, ListJobsParams, RetryParams};
use jsonrpsee::types::ErrorObjectOwned;
use reelimport_core::application::{BulkImportService, CreateImportRequest, ImportOptions};
use reelimport_core::domain::{JobPage, JobSummary, Page, RowPage, RowStatus};
use reelimport_core::error::AppError;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<BulkImportService>,
}

fn require_api_key(api_key: &str) -> Result<(), ErrorObjectOwned> {
    if api_key.trim().is_empty() {
        return Err(to_rpc_error(AppError::Validation(
            "API key is required".to_string(),
        )));
    }
    Ok(())
}

fn parse_status(status: Option<&str>) -> Result<Option<RowStatus>, ErrorObjectOwned> {
    status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_lowercase().parse::<RowStatus>())
        .transpose()
        .map_err(|e| to_rpc_error(e.into()))
}

impl RpcHandler {
    pub fn new(service: Arc<BulkImportService>) -> Self {
        Self { service }
    }

    /// import.create.v1
    pub async fn create_import(
        &self,
        params: CreateImportParams,
    ) -> Result<JobSummary, ErrorObjectOwned> {
        require_api_key(&params.api_key)?;

        info!(
            file_name = %params.file_name,
            bytes = params.content.len(),
            dry_run = params.dry_run,
            "import.create.v1"
        );

        let req = CreateImportRequest {
            file_name: params.file_name,
            content: params.content.into_bytes(),
            credential: params.api_key,
            options: ImportOptions {
                dry_run: params.dry_run,
                skip_duplicates: params.skip_duplicates,
            },
            source: params.source,
        };

        self.service.create_import(req).await.map_err(to_rpc_error)
    }

    /// import.get.v1
    pub async fn get_job(&self, params: GetJobParams) -> Result<JobSummary, ErrorObjectOwned> {
        self.service
            .get_job(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// import.list.v1
    pub async fn list_jobs(&self, params: ListJobsParams) -> Result<JobPage, ErrorObjectOwned> {
        self.service
            .list_jobs(Page::jobs(params.limit, params.offset))
            .await
            .map_err(to_rpc_error)
    }

    /// import.rows.v1
    pub async fn job_rows(&self, params: JobRowsParams) -> Result<RowPage, ErrorObjectOwned> {
        let status = parse_status(params.status.as_deref())?;
        self.service
            .get_job_rows(
                &params.job_id,
                status,
                Page::rows(params.limit, params.offset),
            )
            .await
            .map_err(to_rpc_error)
    }

    /// import.retry.v1
    pub async fn retry(&self, params: RetryParams) -> Result<JobSummary, ErrorObjectOwned> {
        require_api_key(&params.api_key)?;
        info!(job_id = %params.job_id, dry_run = params.dry_run, "import.retry.v1");

        let options = ImportOptions {
            dry_run: params.dry_run,
            skip_duplicates: params.skip_duplicates,
        };
        self.service
            .retry_failed_rows(&params.job_id, &params.api_key, options)
            .await
            .map_err(to_rpc_error)
    }
}
