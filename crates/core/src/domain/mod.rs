// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod profile;
pub mod row;
pub mod summary;

// Re-exports
pub use error::DomainError;
pub use job::{EpochMillis, ImportJob, ImportType, JobCounters, JobId, JobStatus};
pub use profile::{ImportProfile, DEFAULT_MIN_WATCH_YEAR};
pub use row::{
    ImportRow, NormalizedItem, RawPayload, RowErrorCode, RowId, RowOutcome, RowRejection,
    RowStatus,
};
pub use summary::{JobPage, JobSummary, Page, RecentError, RowPage, RECENT_ERRORS_LIMIT};
