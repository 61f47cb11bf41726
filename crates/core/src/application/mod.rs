// Application Layer - Use Cases and Business Logic

pub mod bulk_import;
pub mod dedupe;
pub mod ingest;
pub mod normalize;
pub mod processor;
pub mod recovery;

// Re-exports
pub use bulk_import::{BulkImportService, CreateImportRequest};
pub use processor::{
    ImportOptions, ImportProcessor, ProcessorConfig, RunOutcome, RunRequest, RunScope,
};
pub use recovery::RecoveryService;
