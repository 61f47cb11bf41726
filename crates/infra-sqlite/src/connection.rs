// SQLite Connection Pool Setup

use reelimport_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Pool size for file-backed databases
const MAX_FILE_CONNECTIONS: u32 = 10;

/// `sqlite://` URL for a database file
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Create SQLite connection pool with WAL mode and foreign keys.
///
/// An in-memory URL gets a single long-lived connection: every SQLite
/// connection would otherwise open its own empty database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, AppError> {
    let in_memory = database_url.contains(":memory:");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("Invalid database URL: {}", e)))?
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_FILE_CONNECTIONS)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
