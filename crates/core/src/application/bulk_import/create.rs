// Create Import Use Case

use crate::application::ingest::parse_csv;
use crate::application::processor::ImportOptions;
use crate::domain::{ImportJob, ImportProfile, ImportRow};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobStore, TimeProvider};
use tracing::info;

/// Upload of one CSV file
#[derive(Clone)]
pub struct CreateImportRequest {
    pub file_name: String,
    pub content: Vec<u8>,
    pub credential: String,
    pub options: ImportOptions,
    /// Exporting application; defaults to the profile's source system
    pub source: Option<String>,
}

impl std::fmt::Debug for CreateImportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateImportRequest")
            .field("file_name", &self.file_name)
            .field("content_len", &self.content.len())
            .field("options", &self.options)
            .field("source", &self.source)
            .finish()
    }
}

/// Reject requests that can never produce a job
pub fn validate_request(req: &CreateImportRequest, profile: &ImportProfile) -> Result<()> {
    if req.file_name.trim().is_empty() {
        return Err(AppError::Validation("File name cannot be empty".to_string()));
    }

    if req.credential.trim().is_empty() {
        return Err(AppError::Validation("API key is required".to_string()));
    }

    if let Some(source) = req.source.as_deref() {
        if source != profile.source_system {
            return Err(AppError::Validation(format!(
                "Unsupported source \"{}\"",
                source
            )));
        }
    }

    Ok(())
}

/// Parse the upload and persist a queued job with one pending row per line.
///
/// Ingestion errors (`NoRows`, `MissingHeaders`) surface here; no job is
/// stored when they occur.
pub async fn execute(
    store: &dyn JobStore,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    profile: &ImportProfile,
    req: &CreateImportRequest,
) -> Result<ImportJob> {
    validate_request(req, profile)?;

    let parsed = parse_csv(&req.content, &profile.required_headers)?;

    let job_id = id_provider.generate_id();
    let now = time_provider.now_millis();

    let rows = parsed
        .into_iter()
        .map(|row| {
            ImportRow::new(
                id_provider.generate_id(),
                job_id.clone(),
                row.row_number,
                row.values,
                now,
            )
        })
        .collect();

    let job = ImportJob::new(
        job_id,
        now,
        profile.import_type.clone(),
        profile.source_system.clone(),
        req.file_name.trim(),
        rows,
    );

    store.save(&job).await?;
    info!(
        job_id = %job.id,
        file_name = %job.file_name,
        total_rows = job.counters.total_rows,
        "Created import job"
    );

    Ok(job)
}
