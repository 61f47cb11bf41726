// Import Job Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::row::{ImportRow, RowStatus};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4)
pub type JobId = String;

/// Timestamps are epoch milliseconds (UTC)
pub type EpochMillis = i64;

/// Job Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Partial,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Partial => "partial",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Partial | JobStatus::Failed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "partial" => Ok(JobStatus::Partial),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown job status: {}",
                other
            ))),
        }
    }
}

/// Import Type (one supported kind per deployment, e.g. "movies")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportType(String);

impl ImportType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn movies() -> Self {
        Self::new("movies")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job-level counters.
///
/// Always a pure function of row statuses (`from_rows`), never incremented
/// in place: `processed = success + failed + skipped <= total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_rows: i64,
    pub processed_rows: i64,
    pub success_rows: i64,
    pub failed_rows: i64,
    pub skipped_rows: i64,
}

impl JobCounters {
    pub fn from_rows(rows: &[ImportRow]) -> Self {
        let mut counters = JobCounters {
            total_rows: rows.len() as i64,
            ..Default::default()
        };
        for row in rows {
            match row.status {
                RowStatus::Success => counters.success_rows += 1,
                RowStatus::Failed => counters.failed_rows += 1,
                RowStatus::Skipped => counters.skipped_rows += 1,
                RowStatus::Pending | RowStatus::Processing => {}
            }
        }
        counters.processed_rows =
            counters.success_rows + counters.failed_rows + counters.skipped_rows;
        counters
    }

    /// Terminal status law:
    /// partial iff success > 0 and failed > 0; failed iff failed > 0 and success = 0;
    /// completed otherwise.
    pub fn terminal_status(&self) -> JobStatus {
        match (self.success_rows > 0, self.failed_rows > 0) {
            (true, true) => JobStatus::Partial,
            (false, true) => JobStatus::Failed,
            _ => JobStatus::Completed,
        }
    }
}

/// Import Job Entity (one bulk upload + its rows, ordered by row number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: JobId,
    pub import_type: ImportType,
    /// Provenance tag (exporting application, e.g. "letterboxd")
    pub source_system: String,
    pub file_name: String,
    pub status: JobStatus,

    #[serde(flatten)]
    pub counters: JobCounters,

    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    pub started_at: Option<EpochMillis>,
    pub completed_at: Option<EpochMillis>,

    pub rows: Vec<ImportRow>,
}

impl ImportJob {
    /// Create a queued job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `rows` - Pending rows, in file order
    pub fn new(
        id: impl Into<String>,
        created_at: EpochMillis,
        import_type: ImportType,
        source_system: impl Into<String>,
        file_name: impl Into<String>,
        rows: Vec<ImportRow>,
    ) -> Self {
        let counters = JobCounters::from_rows(&rows);
        Self {
            id: id.into(),
            import_type,
            source_system: source_system.into(),
            file_name: file_name.into(),
            status: JobStatus::Queued,
            counters,
            created_at,
            updated_at: created_at,
            started_at: None,
            completed_at: None,
            rows,
        }
    }

    /// Recompute counters from row statuses
    pub fn recompute_counters(&mut self) {
        self.counters = JobCounters::from_rows(&self.rows);
    }

    /// Transition to Processing (claimed by a processing pass)
    pub fn start(&mut self, now_millis: EpochMillis) -> Result<()> {
        if self.status != JobStatus::Queued {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Processing.to_string(),
            });
        }
        self.status = JobStatus::Processing;
        self.started_at = self.started_at.or(Some(now_millis));
        self.updated_at = now_millis;
        Ok(())
    }

    /// Finalize: recompute counters and derive the terminal status
    pub fn finish(&mut self, now_millis: EpochMillis) -> JobStatus {
        self.recompute_counters();
        self.completed_at = Some(now_millis);
        self.updated_at = now_millis;
        self.status = self.counters.terminal_status();
        self.status
    }

    /// Terminal -> Queued, resetting every failed row to pending.
    ///
    /// Returns the row numbers that were reset (possibly empty).
    pub fn requeue_failed(&mut self, now_millis: EpochMillis) -> Result<Vec<i64>> {
        if !self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Queued.to_string(),
            });
        }

        let mut reset = Vec::new();
        for row in self
            .rows
            .iter_mut()
            .filter(|row| row.status == RowStatus::Failed)
        {
            row.reset_for_retry(now_millis)?;
            reset.push(row.row_number);
        }

        self.status = JobStatus::Queued;
        self.completed_at = None;
        self.updated_at = now_millis;
        self.recompute_counters();
        Ok(reset)
    }

    /// Fail every row that never finished (lost pass), returning how many
    pub fn interrupt_unfinished(&mut self, now_millis: EpochMillis) -> usize {
        let mut interrupted = 0;
        for row in self.rows.iter_mut().filter(|r| !r.status.is_terminal()) {
            row.interrupt(now_millis);
            interrupted += 1;
        }
        interrupted
    }

    pub fn row_by_number(&self, row_number: i64) -> Option<&ImportRow> {
        self.rows.iter().find(|r| r.row_number == row_number)
    }
}
