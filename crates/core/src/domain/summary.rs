// Read-side projections: summaries and pages

use crate::domain::job::{EpochMillis, ImportJob, ImportType, JobCounters, JobId, JobStatus};
use crate::domain::row::{ImportRow, RowErrorCode, RowStatus};
use serde::{Deserialize, Serialize};

/// Number of most recent failed rows carried by a summary
pub const RECENT_ERRORS_LIMIT: usize = 20;

/// Page size bounds
pub const MAX_PAGE_LIMIT: u32 = 500;
pub const DEFAULT_ROWS_LIMIT: u32 = 50;
pub const DEFAULT_JOBS_LIMIT: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentError {
    pub row_number: i64,
    pub error_code: Option<RowErrorCode>,
    pub error_message: Option<String>,
}

impl RecentError {
    /// Last `RECENT_ERRORS_LIMIT` failed rows, in row-number order
    pub fn collect(rows: &[ImportRow]) -> Vec<RecentError> {
        let failed: Vec<&ImportRow> = rows
            .iter()
            .filter(|r| r.status == RowStatus::Failed)
            .collect();
        let skip = failed.len().saturating_sub(RECENT_ERRORS_LIMIT);
        failed
            .into_iter()
            .skip(skip)
            .map(|r| RecentError {
                row_number: r.row_number,
                error_code: r.error_code,
                error_message: r.error_message.clone(),
            })
            .collect()
    }
}

/// Job header + counters + recent failures (no row payloads)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub import_type: ImportType,
    pub source_system: String,
    pub status: JobStatus,
    pub file_name: String,
    #[serde(flatten)]
    pub counters: JobCounters,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    pub started_at: Option<EpochMillis>,
    pub completed_at: Option<EpochMillis>,
    pub recent_errors: Vec<RecentError>,
}

impl JobSummary {
    pub fn from_job(job: &ImportJob) -> Self {
        Self {
            id: job.id.clone(),
            import_type: job.import_type.clone(),
            source_system: job.source_system.clone(),
            status: job.status,
            file_name: job.file_name.clone(),
            counters: job.counters,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            recent_errors: RecentError::collect(&job.rows),
        }
    }
}

/// limit/offset pagination (limit clamped to 1..=MAX_PAGE_LIMIT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }

    pub fn rows(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self::new(limit.unwrap_or(DEFAULT_ROWS_LIMIT), offset.unwrap_or(0))
    }

    pub fn jobs(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self::new(limit.unwrap_or(DEFAULT_JOBS_LIMIT), offset.unwrap_or(0))
    }

    /// Apply to an in-memory slice
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset as usize).min(items.len());
        let end = start.saturating_add(self.limit as usize).min(items.len());
        &items[start..end]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowPage {
    /// Post-filter total
    pub total: i64,
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    pub total: i64,
    pub jobs: Vec<JobSummary>,
}
