// Migration Runner

use reelimport_core::error::AppError;
use sqlx::SqlitePool;
use tracing::info;

/// Ordered schema migrations; each script records its own version
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "import jobs and rows",
    include_str!("../migrations/001_initial_schema.sql"),
)];

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Database(format!("Migration failed: {}", e))
}

/// Bring the schema up to the latest version
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    let current = schema_version(pool).await?;
    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _, _)| *v > current).collect();
    if pending.is_empty() {
        info!(version = current, "Schema up to date");
        return Ok(());
    }

    for (version, name, sql) in pending {
        info!(version, name, "Applying migration");
        apply_migration(pool, sql).await?;
    }
    Ok(())
}

/// 0 for a fresh database
async fn schema_version(pool: &SqlitePool) -> Result<i64, AppError> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await
    .map_err(db_err)?;
    if !has_table {
        return Ok(0);
    }

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;
    Ok(version.unwrap_or(0))
}

async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(db_err)?;
    for statement in statements(sql) {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
    }
    tx.commit().await.map_err(db_err)
}

/// Split a script on `;`, dropping `--` comment lines and empty statements
fn statements(sql: &str) -> impl Iterator<Item = String> + '_ {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
}
