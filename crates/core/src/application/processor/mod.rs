// Import Processor - drives one job from queued to a terminal status

pub mod constants;
mod panic_guard;
mod single_flight;

use constants::{DEFAULT_REJECTION_MESSAGE, DRY_RUN_TARGET_ID};
pub use panic_guard::{execute_guarded_async, panic_message, PanicGuardResult};
pub use single_flight::{ClaimGuard, InFlightJobs};

use crate::application::dedupe::DedupeResolver;
use crate::application::normalize::normalize_row;
use crate::domain::{
    ImportJob, ImportProfile, ImportRow, JobId, JobStatus, RowErrorCode, RowOutcome,
    RowRejection, RowStatus,
};
use crate::error::Result;
use crate::port::{CreateOutcome, JobStore, NewRecord, RecordService, TimeProvider, TitleCatalog};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Caller-selected processing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Normalize and dedupe, but never call the record service
    pub dry_run: bool,
    /// Mark duplicate titles as skipped instead of submitting them
    pub skip_duplicates: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_duplicates: true,
        }
    }
}

/// Deployment-level processor settings
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    /// Consult the title catalog for cross-system duplicates
    pub remote_dedupe: bool,
    /// Fixed seed for the watch-date RNG (tests); entropy otherwise
    pub rng_seed: Option<u64>,
}

impl ProcessorConfig {
    fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Rows eligible for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Every pending row (initial run)
    Pending,
    /// Pending rows among the given row numbers (retry run)
    Rows(BTreeSet<i64>),
}

impl RunScope {
    pub fn includes(&self, row: &ImportRow) -> bool {
        if row.status != RowStatus::Pending {
            return false;
        }
        match self {
            RunScope::Pending => true,
            RunScope::Rows(numbers) => numbers.contains(&row.row_number),
        }
    }
}

/// Everything a pass needs besides the stored job
#[derive(Clone)]
pub struct RunRequest {
    pub job_id: JobId,
    pub credential: String,
    pub options: ImportOptions,
    pub scope: RunScope,
}

impl std::fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRequest")
            .field("job_id", &self.job_id)
            .field("credential", &"<redacted>")
            .field("options", &self.options)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Pass ran and the job reached this terminal status
    Finished(JobStatus),
    /// Another pass holds the job; nothing was done
    AlreadyRunning,
    NotFound,
    /// Job was not queued (nothing to claim)
    NotQueued(JobStatus),
}

/// Processes jobs row by row, one pass per job at a time
pub struct ImportProcessor {
    store: Arc<dyn JobStore>,
    records: Arc<dyn RecordService>,
    catalog: Arc<dyn TitleCatalog>,
    time_provider: Arc<dyn TimeProvider>,
    profile: ImportProfile,
    config: ProcessorConfig,
    in_flight: InFlightJobs,
}

impl ImportProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        records: Arc<dyn RecordService>,
        catalog: Arc<dyn TitleCatalog>,
        time_provider: Arc<dyn TimeProvider>,
        profile: ImportProfile,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            records,
            catalog,
            time_provider,
            profile,
            config,
            in_flight: InFlightJobs::new(),
        }
    }

    pub fn profile(&self) -> &ImportProfile {
        &self.profile
    }

    pub fn in_flight(&self) -> &InFlightJobs {
        &self.in_flight
    }

    /// Claim a job for a pass; `None` when one is already in flight
    pub fn claim(&self, job_id: &str) -> Option<ClaimGuard> {
        self.in_flight.try_claim(job_id)
    }

    /// Claim and run in the background. Returns `None` (and logs) when the
    /// job already has a pass in flight.
    pub fn trigger(self: &Arc<Self>, request: RunRequest) -> Option<JoinHandle<()>> {
        match self.claim(&request.job_id) {
            Some(claim) => Some(self.spawn(claim, request)),
            None => {
                warn!(job_id = %request.job_id, "Skipping process trigger: already running");
                None
            }
        }
    }

    /// Run an already-claimed pass on its own task (the caller does not wait)
    pub fn spawn(self: &Arc<Self>, claim: ClaimGuard, request: RunRequest) -> JoinHandle<()> {
        let processor = Arc::clone(self);
        tokio::spawn(async move {
            let job_id = request.job_id.clone();
            match processor.run_claimed(claim, request).await {
                Ok(outcome) => debug!(job_id = %job_id, outcome = ?outcome, "Processing pass ended"),
                Err(e) => error!(job_id = %job_id, error = %e, "Processing pass failed"),
            }
        })
    }

    /// Claim and run inline
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        match self.claim(&request.job_id) {
            Some(claim) => self.run_claimed(claim, request).await,
            None => {
                warn!(job_id = %request.job_id, "Skipping process trigger: already running");
                Ok(RunOutcome::AlreadyRunning)
            }
        }
    }

    /// Run a pass under `claim`, which is released on every exit path
    pub async fn run_claimed(&self, claim: ClaimGuard, request: RunRequest) -> Result<RunOutcome> {
        let _claim = claim;

        let mut job = match self.store.get(&request.job_id).await? {
            Some(job) => job,
            None => {
                warn!(job_id = %request.job_id, "Job vanished before processing");
                return Ok(RunOutcome::NotFound);
            }
        };

        if let Err(e) = job.start(self.time_provider.now_millis()) {
            warn!(job_id = %job.id, status = %job.status, error = %e, "Job is not queued, skipping pass");
            return Ok(RunOutcome::NotQueued(job.status));
        }
        self.store.save(&job).await?;

        info!(
            job_id = %job.id,
            total_rows = job.counters.total_rows,
            dry_run = request.options.dry_run,
            skip_duplicates = request.options.skip_duplicates,
            "Processing import job"
        );

        let result = execute_guarded_async(self.process_rows(&mut job, &request)).await;
        let clean = match result {
            PanicGuardResult::Success(Ok(())) => true,
            PanicGuardResult::Success(Err(e)) => {
                error!(job_id = %job.id, error = %e, "Row loop aborted");
                false
            }
            PanicGuardResult::Panicked(_) => false,
        };

        if !clean {
            let interrupted = job.interrupt_unfinished(self.time_provider.now_millis());
            if interrupted > 0 {
                warn!(job_id = %job.id, interrupted, "Marked unfinished rows as interrupted");
            }
        }

        Ok(RunOutcome::Finished(self.finalize(&mut job).await))
    }

    /// Counters, terminal status and timestamps; persistence errors are logged
    async fn finalize(&self, job: &mut ImportJob) -> JobStatus {
        let status = job.finish(self.time_provider.now_millis());
        if let Err(e) = self.store.save(job).await {
            error!(job_id = %job.id, error = %e, "Failed to persist finalized job");
        }
        info!(
            job_id = %job.id,
            status = %status,
            success_rows = job.counters.success_rows,
            failed_rows = job.counters.failed_rows,
            skipped_rows = job.counters.skipped_rows,
            "Finished import job"
        );
        status
    }

    async fn process_rows(&self, job: &mut ImportJob, request: &RunRequest) -> Result<()> {
        let mut dedupe = DedupeResolver::load(
            self.catalog.as_ref(),
            &request.credential,
            self.config.remote_dedupe,
        )
        .await;
        let today = self.time_provider.today_utc();
        let mut rng = self.config.rng();

        for idx in 0..job.rows.len() {
            if !request.scope.includes(&job.rows[idx]) {
                continue;
            }

            let row_number = job.rows[idx].row_number;
            job.rows[idx].begin_attempt(self.time_provider.now_millis())?;
            self.checkpoint(job, row_number).await?;

            self.attempt_row(&mut job.rows[idx], &mut dedupe, today, &mut rng, request)
                .await?;
            self.checkpoint(job, row_number).await?;
        }
        Ok(())
    }

    /// Persist the job header and one row
    async fn checkpoint(&self, job: &mut ImportJob, row_number: i64) -> Result<()> {
        job.recompute_counters();
        job.updated_at = self.time_provider.now_millis();
        self.store.save_row(job, row_number).await
    }

    /// One processing row: normalize, dedupe, dispatch. Leaves the row terminal.
    async fn attempt_row(
        &self,
        row: &mut ImportRow,
        dedupe: &mut DedupeResolver,
        today: NaiveDate,
        rng: &mut StdRng,
        request: &RunRequest,
    ) -> Result<()> {
        let item = match normalize_row(&row.raw_payload, &self.profile, today, rng) {
            Ok(item) => item,
            Err(rejection) => {
                debug!(row_number = row.row_number, code = %rejection.code, "Row rejected");
                row.reject(rejection, self.time_provider.now_millis())?;
                return Ok(());
            }
        };
        row.set_normalized(item.clone());

        if request.options.skip_duplicates {
            if let Some(source) = dedupe.check(&item.title) {
                row.settle(
                    RowOutcome::Skipped(source.rejection()),
                    self.time_provider.now_millis(),
                )?;
                return Ok(());
            }
        }
        dedupe.accept(&item.title);

        let outcome = if request.options.dry_run {
            RowOutcome::Success {
                target_record_id: Some(DRY_RUN_TARGET_ID.to_string()),
            }
        } else {
            let record = NewRecord {
                title: item.title.clone(),
                date: item.date,
                year: item.year_hint,
            };
            match self.records.create(&record, &request.credential).await {
                Ok(CreateOutcome::Created { id }) => {
                    dedupe.record_created(&item.title);
                    RowOutcome::Success {
                        target_record_id: id,
                    }
                }
                Ok(CreateOutcome::Rejected { message }) => {
                    let message = if message.trim().is_empty() {
                        DEFAULT_REJECTION_MESSAGE.to_string()
                    } else {
                        message
                    };
                    RowOutcome::Failed(RowRejection::new(RowErrorCode::UpsertFailed, message))
                }
                Err(e) => RowOutcome::Failed(RowRejection::new(
                    RowErrorCode::UpsertException,
                    e.to_string(),
                )),
            }
        };

        row.settle(outcome, self.time_provider.now_millis())?;
        Ok(())
    }
}
