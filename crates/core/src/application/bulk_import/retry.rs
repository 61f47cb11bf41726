// Retry Failed Rows Use Case

use crate::application::processor::{ClaimGuard, ImportProcessor};
use crate::domain::{DomainError, ImportJob, JobId, JobSummary};
use crate::error::{AppError, Result};
use crate::port::{JobStore, TimeProvider};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// What the retry operation decided
pub enum RetryPlan {
    /// Job was requeued; run a pass over `rows` under `claim`
    Requeued {
        summary: JobSummary,
        rows: BTreeSet<i64>,
        claim: ClaimGuard,
    },
    /// Nothing to do; current state returned
    NoOp(JobSummary),
}

/// Claim the job, reset its failed rows to pending and persist it queued.
///
/// A job with a pass in flight, an unsupported import type, or a
/// non-terminal status is left untouched.
pub async fn execute(
    store: &dyn JobStore,
    time_provider: &dyn TimeProvider,
    processor: &ImportProcessor,
    job_id: &str,
) -> Result<RetryPlan> {
    let job_id = job_id.to_string();

    let Some(claim) = processor.claim(&job_id) else {
        warn!(job_id = %job_id, "Retry ignored: pass already in flight");
        let job = load(store, &job_id).await?;
        return Ok(RetryPlan::NoOp(JobSummary::from_job(&job)));
    };

    let mut job = load(store, &job_id).await?;

    if !processor.profile().supports(&job.import_type) {
        warn!(job_id = %job.id, import_type = %job.import_type, "Retry ignored: unsupported import type");
        return Ok(RetryPlan::NoOp(JobSummary::from_job(&job)));
    }

    let reset = match job.requeue_failed(time_provider.now_millis()) {
        Ok(reset) => reset,
        Err(DomainError::InvalidStateTransition { from, .. }) => {
            warn!(job_id = %job.id, status = %from, "Retry ignored: job is not terminal");
            return Ok(RetryPlan::NoOp(JobSummary::from_job(&job)));
        }
        Err(e) => return Err(e.into()),
    };

    store.save(&job).await?;
    info!(job_id = %job.id, reset_rows = reset.len(), "Requeued failed rows");

    Ok(RetryPlan::Requeued {
        summary: JobSummary::from_job(&job),
        rows: reset.into_iter().collect(),
        claim,
    })
}

async fn load(store: &dyn JobStore, job_id: &JobId) -> Result<ImportJob> {
    store
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))
}
