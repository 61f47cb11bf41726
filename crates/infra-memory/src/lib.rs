// Reelimport Infrastructure - In-Memory Adapter
// Implements: JobStore (non-durable fallback when no database is configured)

mod job_store;

pub use job_store::MemoryJobStore;
