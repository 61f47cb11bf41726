//! RPC Request/Response Types
//!
//! Method parameters. Results are the core read models (`JobSummary`,
//! `JobPage`, `RowPage`) serialized as-is.

use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// import.create.v1 - Upload a CSV and start processing
#[derive(Deserialize)]
pub struct CreateImportParams {
    pub file_name: String,
    /// CSV text (UTF-8)
    pub content: String,
    pub api_key: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub skip_duplicates: bool,
    #[serde(default)]
    pub source: Option<String>,
}

impl std::fmt::Debug for CreateImportParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateImportParams")
            .field("file_name", &self.file_name)
            .field("content_len", &self.content.len())
            .field("dry_run", &self.dry_run)
            .field("skip_duplicates", &self.skip_duplicates)
            .field("source", &self.source)
            .finish()
    }
}

/// import.get.v1 - Job summary
#[derive(Debug, Deserialize)]
pub struct GetJobParams {
    pub job_id: String,
}

/// import.list.v1 - Jobs, newest first
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// import.rows.v1 - Rows of one job
#[derive(Debug, Deserialize)]
pub struct JobRowsParams {
    pub job_id: String,
    /// pending | processing | success | failed | skipped
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// import.retry.v1 - Requeue failed rows
#[derive(Deserialize)]
pub struct RetryParams {
    pub job_id: String,
    pub api_key: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub skip_duplicates: bool,
}

impl std::fmt::Debug for RetryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryParams")
            .field("job_id", &self.job_id)
            .field("dry_run", &self.dry_run)
            .field("skip_duplicates", &self.skip_duplicates)
            .finish()
    }
}
