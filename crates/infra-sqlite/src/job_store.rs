// SQLite JobStore Implementation

use async_trait::async_trait;
use reelimport_core::domain::{
    ImportJob, ImportRow, ImportType, JobCounters, JobId, JobPage, JobStatus, JobSummary, Page,
    RecentError, RowPage, RowStatus, RECENT_ERRORS_LIMIT,
};
use reelimport_core::error::{AppError, Result};
use reelimport_core::port::JobStore;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Map sqlx failures onto `AppError::Database`, naming the constraint
/// families the import schema declares
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    let sqlx::Error::Database(db_err) = &err else {
        return AppError::Database(err.to_string());
    };
    // Extended result codes: https://www.sqlite.org/rescode.html
    let kind = match db_err.code().as_deref() {
        Some("2067") | Some("1555") => "Duplicate row number for job",
        Some("787") => "Row references a missing job",
        Some("275") => "Invalid status value",
        Some("5") | Some("517") => "Database locked",
        _ => "Database error",
    };
    AppError::Database(format!("{}: {}", kind, db_err.message()))
}

/// Durable store: one `import_jobs` header row per job plus one
/// `import_rows` row per CSV line. Every write is a single transaction.
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert_header(tx: &mut Transaction<'_, Sqlite>, job: &ImportJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs (
                id, import_type, source_system, file_name, status,
                total_rows, processed_rows, success_rows, failed_rows, skipped_rows,
                created_at, updated_at, started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                total_rows = excluded.total_rows,
                processed_rows = excluded.processed_rows,
                success_rows = excluded.success_rows,
                failed_rows = excluded.failed_rows,
                skipped_rows = excluded.skipped_rows,
                updated_at = excluded.updated_at,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&job.id)
        .bind(job.import_type.as_str())
        .bind(&job.source_system)
        .bind(&job.file_name)
        .bind(job.status.as_str())
        .bind(job.counters.total_rows)
        .bind(job.counters.processed_rows)
        .bind(job.counters.success_rows)
        .bind(job.counters.failed_rows)
        .bind(job.counters.skipped_rows)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn upsert_row(tx: &mut Transaction<'_, Sqlite>, row: &ImportRow) -> Result<()> {
        let raw_payload = serde_json::to_string(&row.raw_payload)?;
        let normalized_payload = row
            .normalized_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // raw_payload is immutable once inserted
        sqlx::query(
            r#"
            INSERT INTO import_rows (
                id, job_id, row_number, raw_payload, normalized_payload,
                status, error_code, error_message, target_record_id,
                attempt_count, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                normalized_payload = excluded.normalized_payload,
                status = excluded.status,
                error_code = excluded.error_code,
                error_message = excluded.error_message,
                target_record_id = excluded.target_record_id,
                attempt_count = excluded.attempt_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.id)
        .bind(&row.job_id)
        .bind(row.row_number)
        .bind(raw_payload)
        .bind(normalized_payload)
        .bind(row.status.as_str())
        .bind(row.error_code.map(|c| c.as_str()))
        .bind(&row.error_message)
        .bind(&row.target_record_id)
        .bind(row.attempt_count)
        .bind(row.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn fetch_header(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        sqlx::query_as::<_, JobRecord>("SELECT * FROM import_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn recent_errors(&self, job_id: &JobId) -> Result<Vec<RecentError>> {
        let records: Vec<RecentErrorRecord> = sqlx::query_as(
            r#"
            SELECT row_number, error_code, error_message FROM import_rows
            WHERE job_id = ? AND status = 'failed'
            ORDER BY row_number DESC
            LIMIT ?
            "#,
        )
        .bind(job_id)
        .bind(RECENT_ERRORS_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        records
            .into_iter()
            .rev()
            .map(RecentErrorRecord::into_recent_error)
            .collect()
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn save(&self, job: &ImportJob) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        Self::upsert_header(&mut tx, job).await?;
        for row in &job.rows {
            Self::upsert_row(&mut tx, row).await?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn save_row(&self, job: &ImportJob, row_number: i64) -> Result<()> {
        let row = job.row_by_number(row_number).ok_or_else(|| {
            AppError::NotFound(format!("Row {} not found in job {}", row_number, job.id))
        })?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Self::upsert_header(&mut tx, job).await?;
        Self::upsert_row(&mut tx, row).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<ImportJob>> {
        let Some(header) = self.fetch_header(job_id).await? else {
            return Ok(None);
        };

        let records: Vec<RowRecord> =
            sqlx::query_as("SELECT * FROM import_rows WHERE job_id = ? ORDER BY row_number ASC")
                .bind(job_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let rows = records
            .into_iter()
            .map(RowRecord::into_row)
            .collect::<Result<Vec<_>>>()?;

        header.into_job(rows).map(Some)
    }

    async fn get_rows(
        &self,
        job_id: &JobId,
        status: Option<RowStatus>,
        page: Page,
    ) -> Result<Option<RowPage>> {
        if self.fetch_header(job_id).await?.is_none() {
            return Ok(None);
        }

        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM import_rows WHERE job_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(job_id)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let records: Vec<RowRecord> = sqlx::query_as(
            r#"
            SELECT * FROM import_rows
            WHERE job_id = ? AND (? IS NULL OR status = ?)
            ORDER BY row_number ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(job_id)
        .bind(status)
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows = records
            .into_iter()
            .map(RowRecord::into_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RowPage { total, rows }))
    }

    async fn list_jobs(&self, page: Page) -> Result<JobPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let headers: Vec<JobRecord> = sqlx::query_as(
            r#"
            SELECT * FROM import_jobs
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut jobs = Vec::with_capacity(headers.len());
        for header in headers {
            let recent_errors = self.recent_errors(&header.id).await?;
            let mut summary = JobSummary::from_job(&header.into_job(Vec::new())?);
            summary.recent_errors = recent_errors;
            jobs.push(summary);
        }

        Ok(JobPage { total, jobs })
    }

    async fn find_ids_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobId>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT id FROM import_jobs WHERE status IN ({}) ORDER BY created_at ASC",
            placeholders
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        query.fetch_all(&self.pool).await.map_err(map_sqlx_error)
    }
}

/// SQLite representation of a job header
#[derive(Debug, sqlx::FromRow)]
struct JobRecord {
    id: String,
    import_type: String,
    source_system: String,
    file_name: String,
    status: String,
    total_rows: i64,
    processed_rows: i64,
    success_rows: i64,
    failed_rows: i64,
    skipped_rows: i64,
    created_at: i64,
    updated_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
}

impl JobRecord {
    fn into_job(self, rows: Vec<ImportRow>) -> Result<ImportJob> {
        Ok(ImportJob {
            id: self.id,
            import_type: ImportType::new(self.import_type),
            source_system: self.source_system,
            file_name: self.file_name,
            status: self.status.parse()?,
            counters: JobCounters {
                total_rows: self.total_rows,
                processed_rows: self.processed_rows,
                success_rows: self.success_rows,
                failed_rows: self.failed_rows,
                skipped_rows: self.skipped_rows,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            rows,
        })
    }
}

/// SQLite representation of one import row
#[derive(Debug, sqlx::FromRow)]
struct RowRecord {
    id: String,
    job_id: String,
    row_number: i64,
    raw_payload: String,
    normalized_payload: Option<String>,
    status: String,
    error_code: Option<String>,
    error_message: Option<String>,
    target_record_id: Option<String>,
    attempt_count: i32,
    updated_at: i64,
}

impl RowRecord {
    fn into_row(self) -> Result<ImportRow> {
        Ok(ImportRow {
            id: self.id,
            job_id: self.job_id,
            row_number: self.row_number,
            raw_payload: serde_json::from_str(&self.raw_payload)?,
            normalized_payload: self
                .normalized_payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            status: self.status.parse()?,
            error_code: self.error_code.as_deref().map(str::parse).transpose()?,
            error_message: self.error_message,
            target_record_id: self.target_record_id,
            attempt_count: self.attempt_count,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecentErrorRecord {
    row_number: i64,
    error_code: Option<String>,
    error_message: Option<String>,
}

impl RecentErrorRecord {
    fn into_recent_error(self) -> Result<RecentError> {
        Ok(RecentError {
            row_number: self.row_number,
            error_code: self.error_code.as_deref().map(str::parse).transpose()?,
            error_message: self.error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use chrono::NaiveDate;
    use reelimport_core::domain::{
        NormalizedItem, RawPayload, RowErrorCode, RowOutcome, RowRejection,
    };

    async fn setup_store() -> SqliteJobStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobStore::new(pool)
    }

    fn job(id: &str, created_at: i64, rows: i64) -> ImportJob {
        let rows = (0..rows)
            .map(|i| {
                let mut raw = RawPayload::new();
                raw.insert("Name".to_string(), format!("Movie {}", i));
                ImportRow::new(format!("{}-row-{}", id, i), id, i + 2, raw, created_at)
            })
            .collect();
        ImportJob::new(id, created_at, ImportType::movies(), "letterboxd", "watched.csv", rows)
    }

    fn fail(job: &mut ImportJob, idx: usize) {
        job.rows[idx].begin_attempt(10).unwrap();
        job.rows[idx]
            .settle(
                RowOutcome::Failed(RowRejection::new(RowErrorCode::UpsertFailed, "nope")),
                11,
            )
            .unwrap();
    }

    fn succeed(job: &mut ImportJob, idx: usize) {
        job.rows[idx].begin_attempt(10).unwrap();
        job.rows[idx].set_normalized(NormalizedItem {
            title: "Movie".to_string(),
            date: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
            year_hint: Some(2001),
            source_reference: None,
        });
        job.rows[idx]
            .settle(
                RowOutcome::Success {
                    target_record_id: Some("m-1".to_string()),
                },
                11,
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = setup_store().await;
        let mut job = job("job-1", 1000, 3);
        job.start(1001).unwrap();
        succeed(&mut job, 0);
        fail(&mut job, 1);
        job.finish(1002);

        store.save(&job).await.unwrap();
        let loaded = store.get(&job.id).await.unwrap().unwrap();

        assert_eq!(loaded, job);
        assert_eq!(loaded.rows[1].error_code, Some(RowErrorCode::UpsertFailed));
        assert_eq!(
            loaded.rows[0].normalized_payload.as_ref().unwrap().date,
            NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_missing_job() {
        let store = setup_store().await;
        assert!(store.get(&"nope".to_string()).await.unwrap().is_none());
        assert!(store
            .get_rows(&"nope".to_string(), None, Page::rows(None, None))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_row_updates_header_and_one_row() {
        let store = setup_store().await;
        let mut job = job("job-1", 1000, 2);
        store.save(&job).await.unwrap();

        job.start(1001).unwrap();
        succeed(&mut job, 0);
        job.recompute_counters();
        store.save_row(&job, 2).await.unwrap();

        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.counters.success_rows, 1);
        assert_eq!(loaded.rows[0].status, RowStatus::Success);
        assert_eq!(loaded.rows[1].status, RowStatus::Pending);

        assert!(store.save_row(&job, 99).await.is_err());
    }

    #[tokio::test]
    async fn test_get_rows_filters_and_pages() {
        let store = setup_store().await;
        let mut job = job("job-1", 1000, 6);
        job.start(1001).unwrap();
        for idx in [0, 2, 4] {
            fail(&mut job, idx);
        }
        store.save(&job).await.unwrap();

        let page = store
            .get_rows(&job.id, Some(RowStatus::Failed), Page::new(2, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.total, 3);
        let numbers: Vec<i64> = page.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![4, 6]);

        let all = store
            .get_rows(&job.id, None, Page::rows(None, None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(all.total, 6);
        assert_eq!(all.rows.len(), 6);
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first_with_recent_errors() {
        let store = setup_store().await;
        let mut older = job("job-old", 1000, 2);
        older.start(1001).unwrap();
        fail(&mut older, 1);
        older.finish(1002);
        store.save(&older).await.unwrap();
        store.save(&job("job-new", 2000, 1)).await.unwrap();

        let page = store.list_jobs(Page::jobs(None, None)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.jobs[0].id, "job-new");
        assert_eq!(page.jobs[1].id, "job-old");
        assert_eq!(page.jobs[1].recent_errors.len(), 1);
        assert_eq!(page.jobs[1].recent_errors[0].row_number, 3);

        let second = store.list_jobs(Page::new(1, 1)).await.unwrap();
        assert_eq!(second.total, 2);
        assert_eq!(second.jobs.len(), 1);
        assert_eq!(second.jobs[0].id, "job-old");
    }

    #[tokio::test]
    async fn test_find_ids_by_status() {
        let store = setup_store().await;
        store.save(&job("queued", 1000, 1)).await.unwrap();
        let mut processing = job("processing", 1001, 1);
        processing.start(1002).unwrap();
        store.save(&processing).await.unwrap();
        let mut done = job("done", 1003, 0);
        done.start(1004).unwrap();
        done.finish(1005);
        store.save(&done).await.unwrap();

        let ids = store
            .find_ids_by_status(&[JobStatus::Queued, JobStatus::Processing])
            .await
            .unwrap();
        assert_eq!(ids, vec!["queued".to_string(), "processing".to_string()]);
        assert!(store.find_ids_by_status(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_constraint_violations_are_named() {
        let store = setup_store().await;

        let err = sqlx::query(
            "INSERT INTO import_rows (id, job_id, row_number, raw_payload, status, updated_at) \
             VALUES ('r-1', 'ghost', 2, '{}', 'pending', 0)",
        )
        .execute(&store.pool)
        .await
        .map_err(map_sqlx_error)
        .unwrap_err();
        assert!(err.to_string().contains("missing job"), "{err}");

        let err = sqlx::query(
            "INSERT INTO import_jobs (id, import_type, source_system, file_name, status, created_at, updated_at) \
             VALUES ('j-1', 'MOVIES', 'letterboxd', 'a.csv', 'running', 0, 0)",
        )
        .execute(&store.pool)
        .await
        .map_err(map_sqlx_error)
        .unwrap_err();
        assert!(err.to_string().contains("Invalid status value"), "{err}");
    }
}
