// Panic isolation for processing passes
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed
    Success(T),
    /// Execution panicked
    Panicked(String),
}

impl<T> PanicGuardResult<T> {
    pub fn is_panicked(&self) -> bool {
        matches!(self, PanicGuardResult::Panicked(_))
    }
}

/// Drive a future to completion, catching any panic it raises.
///
/// The caller regains control after a panic so that finalization (job
/// status, counters, claim release) still runs.
pub async fn execute_guarded_async<F, T>(future: F) -> PanicGuardResult<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => PanicGuardResult::Success(value),
        Err(payload) => {
            let panic_msg = panic_message(payload.as_ref());
            error!(panic_msg = %panic_msg, "Processing pass panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
