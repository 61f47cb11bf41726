// Single-flight registry: at most one processing pass per job

use crate::domain::JobId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Job ids with a pass currently in flight (process-wide)
#[derive(Debug, Clone, Default)]
pub struct InFlightJobs {
    inner: Arc<Mutex<HashSet<JobId>>>,
}

impl InFlightJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `job_id`; `None` when a pass already holds it.
    ///
    /// The claim lasts until the returned guard is dropped.
    pub fn try_claim(&self, job_id: &str) -> Option<ClaimGuard> {
        if !self.lock().insert(job_id.to_string()) {
            return None;
        }
        Some(ClaimGuard {
            job_id: job_id.to_string(),
            registry: self.clone(),
        })
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().contains(job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The set stays consistent across a panic, so poisoning is ignored
    fn lock(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the whole lifetime of a processing pass
#[derive(Debug)]
pub struct ClaimGuard {
    job_id: JobId,
    registry: InFlightJobs,
}

impl ClaimGuard {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.job_id);
    }
}
