// Crash recovery: finalize jobs a previous process left unfinished
use crate::application::processor::constants::UNFINISHED_JOB_STATUSES;
use crate::port::{JobStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Startup recovery service
///
/// Passes live only in process memory, so a `queued` or `processing` job
/// found at startup has no pass that will ever finish it. Its unfinished
/// rows are failed as interrupted and the job gets a terminal status,
/// which makes them eligible for retry.
pub struct RecoveryService {
    store: Arc<dyn JobStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(store: Arc<dyn JobStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            time_provider,
        }
    }

    /// Recover orphaned jobs on daemon startup
    ///
    /// # Returns
    /// Number of jobs finalized
    pub async fn recover_orphaned_jobs(&self) -> crate::error::Result<usize> {
        let job_ids = self.store.find_ids_by_status(&UNFINISHED_JOB_STATUSES).await?;
        info!(candidates = job_ids.len(), "Starting orphaned job recovery");

        let mut recovered_count = 0;
        for job_id in job_ids {
            let Some(mut job) = self.store.get(&job_id).await? else {
                continue;
            };
            if job.status.is_terminal() {
                continue;
            }

            let now = self.time_provider.now_millis();
            let interrupted = job.interrupt_unfinished(now);
            let status = job.finish(now);
            self.store.save(&job).await?;

            warn!(
                job_id = %job.id,
                interrupted_rows = interrupted,
                status = %status,
                "Recovered orphaned job"
            );
            recovered_count += 1;
        }

        info!(recovered_count = %recovered_count, "Orphaned job recovery complete");
        Ok(recovered_count)
    }
}
