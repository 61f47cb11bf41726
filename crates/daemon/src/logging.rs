//! Tracing subscriber setup

use crate::config::LogFormat;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "reelimport=info";
const LOG_FILE_PREFIX: &str = "reelimport.log";

/// Install the global subscriber.
///
/// Console output is pretty or JSON. With `log_dir`, events are also written
/// as JSON to a daily-rotated file; the returned guard must be held until
/// exit or buffered lines are lost.
pub fn init(format: LogFormat, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .with(file_layer(file_writer))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .with(file_layer(file_writer))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn file_layer<S>(writer: Option<NonBlocking>) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w))
}
