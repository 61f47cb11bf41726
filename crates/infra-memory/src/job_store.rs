// In-memory JobStore Implementation

use async_trait::async_trait;
use reelimport_core::domain::{
    ImportJob, JobId, JobPage, JobStatus, JobSummary, Page, RowPage, RowStatus,
};
use reelimport_core::error::{AppError, Result};
use reelimport_core::port::JobStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct StoredJob {
    /// Insertion order, breaks `created_at` ties when listing
    seq: u64,
    job: ImportJob,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    jobs: HashMap<JobId, StoredJob>,
}

/// Jobs held in process memory. Reads and writes copy whole jobs, so a
/// caller never observes another caller's in-progress mutation.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, job: &ImportJob) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.jobs.get_mut(&job.id) {
            stored.job = job.clone();
            return Ok(());
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            job.id.clone(),
            StoredJob {
                seq,
                job: job.clone(),
            },
        );
        Ok(())
    }

    async fn save_row(&self, job: &ImportJob, row_number: i64) -> Result<()> {
        let row = job.row_by_number(row_number).ok_or_else(|| {
            AppError::NotFound(format!("Row {} not found in job {}", row_number, job.id))
        })?;

        let mut inner = self.inner.write().await;
        let Some(stored) = inner.jobs.get_mut(&job.id) else {
            drop(inner);
            return self.save(job).await;
        };

        let mut rows = std::mem::take(&mut stored.job.rows);
        match rows.iter_mut().find(|r| r.row_number == row_number) {
            Some(slot) => *slot = row.clone(),
            None => {
                rows.push(row.clone());
                rows.sort_by_key(|r| r.row_number);
            }
        }

        stored.job = ImportJob {
            rows,
            ..header_of(job)
        };
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<ImportJob>> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.get(job_id).map(|stored| stored.job.clone()))
    }

    async fn get_rows(
        &self,
        job_id: &JobId,
        status: Option<RowStatus>,
        page: Page,
    ) -> Result<Option<RowPage>> {
        let inner = self.inner.read().await;
        let Some(stored) = inner.jobs.get(job_id) else {
            return Ok(None);
        };

        let filtered: Vec<_> = stored
            .job
            .rows
            .iter()
            .filter(|row| status.map_or(true, |s| row.status == s))
            .cloned()
            .collect();

        Ok(Some(RowPage {
            total: filtered.len() as i64,
            rows: page.slice(&filtered).to_vec(),
        }))
    }

    async fn list_jobs(&self, page: Page) -> Result<JobPage> {
        let inner = self.inner.read().await;

        let mut ordered: Vec<&StoredJob> = inner.jobs.values().collect();
        ordered.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let jobs = page
            .slice(&ordered)
            .iter()
            .map(|stored| JobSummary::from_job(&stored.job))
            .collect();

        Ok(JobPage {
            total: ordered.len() as i64,
            jobs,
        })
    }

    async fn find_ids_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobId>> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&StoredJob> = inner
            .jobs
            .values()
            .filter(|stored| statuses.contains(&stored.job.status))
            .collect();
        matching.sort_by_key(|stored| (stored.job.created_at, stored.seq));

        Ok(matching.into_iter().map(|s| s.job.id.clone()).collect())
    }
}

/// Header fields of `job` without its rows
fn header_of(job: &ImportJob) -> ImportJob {
    ImportJob {
        id: job.id.clone(),
        import_type: job.import_type.clone(),
        source_system: job.source_system.clone(),
        file_name: job.file_name.clone(),
        status: job.status,
        counters: job.counters,
        created_at: job.created_at,
        updated_at: job.updated_at,
        started_at: job.started_at,
        completed_at: job.completed_at,
        rows: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelimport_core::domain::{
        ImportRow, ImportType, RawPayload, RowErrorCode, RowOutcome, RowRejection,
    };

    fn job(id: &str, created_at: i64, rows: i64) -> ImportJob {
        let rows = (0..rows)
            .map(|i| ImportRow::new(format!("{}-{}", id, i), id, i + 2, RawPayload::new(), 0))
            .collect();
        ImportJob::new(id, created_at, ImportType::movies(), "letterboxd", "a.csv", rows)
    }

    #[tokio::test]
    async fn test_save_and_get_are_copies() {
        let store = MemoryJobStore::new();
        let mut original = job("job-1", 1000, 2);
        store.save(&original).await.unwrap();

        original.start(1001).unwrap();
        let loaded = store.get(&original.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Queued);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_row_replaces_one_row() {
        let store = MemoryJobStore::new();
        let mut job = job("job-1", 1000, 2);
        store.save(&job).await.unwrap();

        job.start(1001).unwrap();
        job.rows[1].begin_attempt(1002).unwrap();
        job.rows[1]
            .settle(
                RowOutcome::Failed(RowRejection::new(RowErrorCode::UpsertException, "timeout")),
                1003,
            )
            .unwrap();
        job.recompute_counters();
        store.save_row(&job, 3).await.unwrap();

        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.counters.failed_rows, 1);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[1].status, RowStatus::Failed);
        assert_eq!(loaded.rows[0].status, RowStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_jobs_orders_ties_by_insertion() {
        let store = MemoryJobStore::new();
        store.save(&job("a", 1000, 0)).await.unwrap();
        store.save(&job("b", 1000, 0)).await.unwrap();
        store.save(&job("c", 900, 0)).await.unwrap();

        let page = store.list_jobs(Page::jobs(None, None)).await.unwrap();
        let ids: Vec<&str> = page.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_get_rows_total_is_post_filter() {
        let store = MemoryJobStore::new();
        let job = job("job-1", 1000, 5);
        store.save(&job).await.unwrap();

        let page = store
            .get_rows(&job.id, Some(RowStatus::Pending), Page::new(2, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.rows.len(), 2);

        let none = store
            .get_rows(&job.id, Some(RowStatus::Success), Page::new(2, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(none.total, 0);
    }
}
