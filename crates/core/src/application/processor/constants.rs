// Processor constants (no magic values)

/// Target id recorded on rows that succeed in a dry run
pub const DRY_RUN_TARGET_ID: &str = "dry-run";

/// Error message for a record-service refusal without a body
pub const DEFAULT_REJECTION_MESSAGE: &str = "Record service rejected the record";

/// Statuses an unfinished (orphaned) job can be left in after a crash
pub const UNFINISHED_JOB_STATUSES: [crate::domain::JobStatus; 2] = [
    crate::domain::JobStatus::Queued,
    crate::domain::JobStatus::Processing,
];
