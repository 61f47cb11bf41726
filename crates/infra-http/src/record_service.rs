// HTTP RecordService Implementation

use crate::client::{build_client, HttpClientConfig, API_KEY_HEADER, RECORDS_PATH};
use async_trait::async_trait;
use reelimport_core::port::{CreateOutcome, NewRecord, RecordService, RecordServiceError};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Creates records with `POST {base_url}/movies`
pub struct HttpRecordService {
    url: String,
    client: Client,
}

impl HttpRecordService {
    pub fn new(config: &HttpClientConfig) -> Result<Self, RecordServiceError> {
        let client =
            build_client(config).map_err(|e| RecordServiceError::Transport(e.to_string()))?;
        Ok(Self {
            url: config.endpoint(RECORDS_PATH),
            client,
        })
    }
}

#[async_trait]
impl RecordService for HttpRecordService {
    async fn create(
        &self,
        record: &NewRecord,
        credential: &str,
    ) -> Result<CreateOutcome, RecordServiceError> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, credential)
            .json(record)
            .send()
            .await
            .map_err(|e| RecordServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecordServiceError::Transport(e.to_string()))?;

        debug!(status = %status, title = %record.title, "Record service answered");
        interpret_create_response(status, &body)
    }
}

/// Map a create response to an outcome.
///
/// A JSON `error` field or a 4xx status is a refusal. 5xx is a transport
/// failure. Otherwise the record was created, with `id` when present.
pub(crate) fn interpret_create_response(
    status: StatusCode,
    body: &str,
) -> Result<CreateOutcome, RecordServiceError> {
    let json: Option<Value> = serde_json::from_str(body).ok();

    if let Some(message) = json.as_ref().and_then(error_message) {
        return Ok(CreateOutcome::Rejected { message });
    }

    if status.is_server_error() {
        return Err(RecordServiceError::Transport(format!(
            "Record service returned {}: {}",
            status,
            body.trim()
        )));
    }

    if status.is_client_error() {
        return Ok(CreateOutcome::Rejected {
            message: format!("Record service returned {}", status),
        });
    }

    if !status.is_success() {
        return Err(RecordServiceError::InvalidResponse(format!(
            "Unexpected status {}",
            status
        )));
    }

    let id = json.as_ref().and_then(|v| v.get("id")).and_then(id_string);
    Ok(CreateOutcome::Created { id })
}

fn error_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
