// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod record_service;
pub mod time_provider;
pub mod title_catalog;

// Re-exports
pub use id_provider::IdProvider;
pub use job_store::JobStore;
pub use record_service::{CreateOutcome, NewRecord, RecordService, RecordServiceError};
pub use time_provider::TimeProvider;
pub use title_catalog::{CatalogError, TitleCatalog};
