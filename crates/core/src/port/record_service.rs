// Record Creation Service Port (downstream system)

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Item submitted downstream for one successfully normalized row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Application-level answer of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Record created (identifier when the service returns one)
    Created { id: Option<String> },
    /// Service answered but refused the record
    Rejected { message: String },
}

/// Transport / unexpected failures (distinct from `Rejected`)
#[derive(Error, Debug)]
pub enum RecordServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Creates downstream records synchronously
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Create one record on behalf of the caller credential
    async fn create(
        &self,
        record: &NewRecord,
        credential: &str,
    ) -> Result<CreateOutcome, RecordServiceError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock behavior per title (falls back to `default`)
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Created with the given id
        Create(Option<String>),
        /// Service-level refusal
        Reject(String),
        /// Transport failure
        Fail(String),
        /// Panic (for finalization-guarantee testing)
        Panic(String),
    }

    /// Mock Record Service recording every call
    pub struct MockRecordService {
        default: MockBehavior,
        per_title: Mutex<HashMap<String, MockBehavior>>,
        delay: Option<Duration>,
        calls: Arc<Mutex<Vec<NewRecord>>>,
    }

    impl MockRecordService {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                per_title: Mutex::new(HashMap::new()),
                delay: None,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Create(Some("record-1".to_string())))
        }

        /// Suspend each call for `delay` (keeps a pass in flight)
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn with_title(self, title: impl Into<String>, behavior: MockBehavior) -> Self {
            self.per_title
                .lock()
                .unwrap()
                .insert(title.into(), behavior);
            self
        }

        pub fn set_title(&self, title: impl Into<String>, behavior: MockBehavior) {
            self.per_title
                .lock()
                .unwrap()
                .insert(title.into(), behavior);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<NewRecord> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordService for MockRecordService {
        async fn create(
            &self,
            record: &NewRecord,
            _credential: &str,
        ) -> Result<CreateOutcome, RecordServiceError> {
            self.calls.lock().unwrap().push(record.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let behavior = self
                .per_title
                .lock()
                .unwrap()
                .get(&record.title)
                .cloned()
                .unwrap_or_else(|| self.default.clone());

            match behavior {
                MockBehavior::Create(id) => Ok(CreateOutcome::Created { id }),
                MockBehavior::Reject(message) => Ok(CreateOutcome::Rejected { message }),
                MockBehavior::Fail(msg) => Err(RecordServiceError::Transport(msg)),
                MockBehavior::Panic(msg) => panic!("{}", msg),
            }
        }
    }
}
