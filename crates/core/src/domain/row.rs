// Import Row Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::job::{EpochMillis, JobId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Row ID (UUID v4)
pub type RowId = String;

/// Original column -> value mapping of one CSV line (immutable after creation)
pub type RawPayload = BTreeMap<String, String>;

/// Row Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Skipped,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Pending => "pending",
            RowStatus::Processing => "processing",
            RowStatus::Success => "success",
            RowStatus::Failed => "failed",
            RowStatus::Skipped => "skipped",
        }
    }

    /// Row has left pending/processing
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RowStatus::Success | RowStatus::Failed | RowStatus::Skipped
        )
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RowStatus::Pending),
            "processing" => Ok(RowStatus::Processing),
            "success" => Ok(RowStatus::Success),
            "failed" => Ok(RowStatus::Failed),
            "skipped" => Ok(RowStatus::Skipped),
            other => Err(DomainError::ValidationError(format!(
                "Unknown row status: {}",
                other
            ))),
        }
    }
}

/// Per-row outcome codes (recorded, never raised)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowErrorCode {
    InvalidTitle,
    DuplicateInFile,
    DuplicateRemote,
    UpsertFailed,
    UpsertException,
    Interrupted,
}

impl RowErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowErrorCode::InvalidTitle => "INVALID_TITLE",
            RowErrorCode::DuplicateInFile => "DUPLICATE_IN_FILE",
            RowErrorCode::DuplicateRemote => "DUPLICATE_REMOTE",
            RowErrorCode::UpsertFailed => "UPSERT_FAILED",
            RowErrorCode::UpsertException => "UPSERT_EXCEPTION",
            RowErrorCode::Interrupted => "INTERRUPTED",
        }
    }
}

impl std::fmt::Display for RowErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowErrorCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INVALID_TITLE" => Ok(RowErrorCode::InvalidTitle),
            "DUPLICATE_IN_FILE" => Ok(RowErrorCode::DuplicateInFile),
            "DUPLICATE_REMOTE" => Ok(RowErrorCode::DuplicateRemote),
            "UPSERT_FAILED" => Ok(RowErrorCode::UpsertFailed),
            "UPSERT_EXCEPTION" => Ok(RowErrorCode::UpsertException),
            "INTERRUPTED" => Ok(RowErrorCode::Interrupted),
            other => Err(DomainError::ValidationError(format!(
                "Unknown row error code: {}",
                other
            ))),
        }
    }
}

/// Canonical item produced by successful normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub title: String,
    /// Watch date, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_hint: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
}

/// Typed rejection (code + human-readable message)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    pub code: RowErrorCode,
    pub message: String,
}

impl RowRejection {
    pub fn new(code: RowErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Terminal outcome of one processing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Success { target_record_id: Option<String> },
    Failed(RowRejection),
    Skipped(RowRejection),
}

/// Import Row Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub id: RowId,
    pub job_id: JobId,
    /// 1-based line in the original file (header is line 1)
    pub row_number: i64,
    pub raw_payload: RawPayload,
    pub normalized_payload: Option<NormalizedItem>,
    pub status: RowStatus,
    pub error_code: Option<RowErrorCode>,
    pub error_message: Option<String>,
    pub target_record_id: Option<String>,
    pub attempt_count: i32,
    pub updated_at: EpochMillis,
}

impl ImportRow {
    /// Create a pending row
    pub fn new(
        id: impl Into<String>,
        job_id: impl Into<String>,
        row_number: i64,
        raw_payload: RawPayload,
        now_millis: EpochMillis,
    ) -> Self {
        Self {
            id: id.into(),
            job_id: job_id.into(),
            row_number,
            raw_payload,
            normalized_payload: None,
            status: RowStatus::Pending,
            error_code: None,
            error_message: None,
            target_record_id: None,
            attempt_count: 0,
            updated_at: now_millis,
        }
    }

    /// pending -> processing, counting the attempt
    pub fn begin_attempt(&mut self, now_millis: EpochMillis) -> Result<()> {
        if self.status != RowStatus::Pending {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: RowStatus::Processing.to_string(),
            });
        }
        self.status = RowStatus::Processing;
        self.attempt_count += 1;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Record the normalized item of the current attempt
    pub fn set_normalized(&mut self, item: NormalizedItem) {
        self.normalized_payload = Some(item);
    }

    /// processing -> success | failed | skipped
    pub fn settle(&mut self, outcome: RowOutcome, now_millis: EpochMillis) -> Result<()> {
        if self.status != RowStatus::Processing {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: match &outcome {
                    RowOutcome::Success { .. } => RowStatus::Success.to_string(),
                    RowOutcome::Failed(_) => RowStatus::Failed.to_string(),
                    RowOutcome::Skipped(_) => RowStatus::Skipped.to_string(),
                },
            });
        }

        match outcome {
            RowOutcome::Success { target_record_id } => {
                self.status = RowStatus::Success;
                self.error_code = None;
                self.error_message = None;
                if target_record_id.is_some() {
                    self.target_record_id = target_record_id;
                }
            }
            RowOutcome::Failed(rejection) => {
                self.status = RowStatus::Failed;
                self.error_code = Some(rejection.code);
                self.error_message = Some(rejection.message);
            }
            RowOutcome::Skipped(rejection) => {
                self.status = RowStatus::Skipped;
                self.error_code = Some(rejection.code);
                self.error_message = Some(rejection.message);
            }
        }
        self.updated_at = now_millis;
        Ok(())
    }

    /// Normalization itself failed: no canonical payload may remain
    pub fn reject(&mut self, rejection: RowRejection, now_millis: EpochMillis) -> Result<()> {
        self.normalized_payload = None;
        self.settle(RowOutcome::Failed(rejection), now_millis)
    }

    /// failed -> pending (retry only), clearing error fields
    pub fn reset_for_retry(&mut self, now_millis: EpochMillis) -> Result<()> {
        if self.status != RowStatus::Failed {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: RowStatus::Pending.to_string(),
            });
        }
        self.status = RowStatus::Pending;
        self.error_code = None;
        self.error_message = None;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Mark an unfinished row as failed after its pass was lost (crash/restart)
    pub fn interrupt(&mut self, now_millis: EpochMillis) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RowStatus::Failed;
        self.error_code = Some(RowErrorCode::Interrupted);
        self.error_message = Some("Processing was interrupted before this row finished".into());
        self.updated_at = now_millis;
    }
}
