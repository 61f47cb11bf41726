//! Reelimport CLI - operator client for the Reelimport daemon

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "reelimport")]
#[command(about = "Reelimport bulk import CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "REELIMPORT_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV export and start an import job
    Create {
        /// Path to the CSV file
        file: PathBuf,

        /// Record service API key
        #[arg(long, env = "REELIMPORT_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Validate and dedupe without creating records
        #[arg(long)]
        dry_run: bool,

        /// Submit duplicate titles instead of skipping them
        #[arg(long)]
        no_skip_duplicates: bool,

        /// Source system tag (must match the daemon's profile)
        #[arg(long)]
        source: Option<String>,
    },

    /// Show one job summary
    Show {
        /// Job ID
        job_id: String,
    },

    /// List jobs, newest first
    List {
        #[arg(short, long)]
        limit: Option<u32>,

        #[arg(short, long)]
        offset: Option<u32>,
    },

    /// List rows of a job
    Rows {
        /// Job ID
        job_id: String,

        /// pending | processing | success | failed | skipped
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        limit: Option<u32>,

        #[arg(short, long)]
        offset: Option<u32>,
    },

    /// Requeue failed rows of a finished job
    Retry {
        /// Job ID
        job_id: String,

        /// Record service API key
        #[arg(long, env = "REELIMPORT_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        no_skip_duplicates: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct RecentError {
    row_number: i64,
    error_code: Option<String>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct JobSummary {
    id: String,
    status: String,
    file_name: String,
    total_rows: i64,
    processed_rows: i64,
    success_rows: i64,
    failed_rows: i64,
    skipped_rows: i64,
    created_at: i64,
    #[serde(default)]
    recent_errors: Vec<RecentError>,
}

#[derive(Deserialize)]
struct JobPage {
    total: i64,
    jobs: Vec<JobSummary>,
}

#[derive(Deserialize)]
struct ImportRow {
    row_number: i64,
    raw_payload: serde_json::Map<String, serde_json::Value>,
    status: String,
    error_code: Option<String>,
    error_message: Option<String>,
    target_record_id: Option<String>,
    attempt_count: i32,
}

#[derive(Deserialize)]
struct RowPage {
    total: i64,
    rows: Vec<ImportRow>,
}

#[derive(Tabled)]
struct JobLine {
    id: String,
    status: String,
    file: String,
    total: i64,
    processed: i64,
    success: i64,
    failed: i64,
    skipped: i64,
    created: String,
}

impl From<&JobSummary> for JobLine {
    fn from(job: &JobSummary) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status.clone(),
            file: job.file_name.clone(),
            total: job.total_rows,
            processed: job.processed_rows,
            success: job.success_rows,
            failed: job.failed_rows,
            skipped: job.skipped_rows,
            created: format_millis(job.created_at),
        }
    }
}

#[derive(Tabled)]
struct RowLine {
    row: i64,
    title: String,
    status: String,
    attempts: i32,
    record: String,
    error: String,
}

impl From<&ImportRow> for RowLine {
    fn from(row: &ImportRow) -> Self {
        Self {
            row: row.row_number,
            title: row
                .raw_payload
                .get("Name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            status: row.status.clone(),
            attempts: row.attempt_count,
            record: row.target_record_id.clone().unwrap_or_default(),
            error: describe_error(row.error_code.as_deref(), row.error_message.as_deref()),
        }
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn describe_error(code: Option<&str>, message: Option<&str>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => String::new(),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn colored_status(status: &str) -> colored::ColoredString {
    match status {
        "completed" => status.green().bold(),
        "partial" => status.yellow().bold(),
        "failed" => status.red().bold(),
        _ => status.cyan().bold(),
    }
}

fn print_summary(job: &JobSummary) {
    println!("  {} {}", "Job:".bold(), job.id);
    println!("  {} {}", "File:".bold(), job.file_name);
    println!("  {} {}", "Status:".bold(), colored_status(&job.status));
    println!();
    println!("{}", Table::new(vec![JobLine::from(job)]));

    if !job.recent_errors.is_empty() {
        println!();
        println!("{}", "Recent errors:".red().bold());
        for err in &job.recent_errors {
            println!(
                "  row {}: {}",
                err.row_number,
                describe_error(err.error_code.as_deref(), err.error_message.as_deref())
            );
        }
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            file,
            api_key,
            dry_run,
            no_skip_duplicates,
            source,
        } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let params = json!({
                "file_name": file_name_of(&file),
                "content": content,
                "api_key": api_key,
                "dry_run": dry_run,
                "skip_duplicates": !no_skip_duplicates,
                "source": source,
            });

            let result = call_rpc(&cli.rpc_url, "import.create.v1", params).await?;
            let job: JobSummary = serde_json::from_value(result)?;

            let banner = if dry_run {
                "✓ Dry-run import created"
            } else {
                "✓ Import job created"
            };
            println!("{}", banner.green().bold());
            println!();
            print_summary(&job);
        }

        Commands::Show { job_id } => {
            let result = call_rpc(&cli.rpc_url, "import.get.v1", json!({ "job_id": job_id })).await?;
            let job: JobSummary = serde_json::from_value(result)?;
            print_summary(&job);
        }

        Commands::List { limit, offset } => {
            let params = json!({ "limit": limit, "offset": offset });
            let result = call_rpc(&cli.rpc_url, "import.list.v1", params).await?;
            let page: JobPage = serde_json::from_value(result)?;

            if page.jobs.is_empty() {
                println!("{}", "No import jobs".yellow());
            } else {
                let lines: Vec<JobLine> = page.jobs.iter().map(JobLine::from).collect();
                println!("{}", Table::new(lines));
            }
            println!("{} {}", "Total:".bold(), page.total);
        }

        Commands::Rows {
            job_id,
            status,
            limit,
            offset,
        } => {
            let params = json!({
                "job_id": job_id,
                "status": status,
                "limit": limit,
                "offset": offset,
            });
            let result = call_rpc(&cli.rpc_url, "import.rows.v1", params).await?;
            let page: RowPage = serde_json::from_value(result)?;

            if page.rows.is_empty() {
                println!("{}", "No matching rows".yellow());
            } else {
                let lines: Vec<RowLine> = page.rows.iter().map(RowLine::from).collect();
                println!("{}", Table::new(lines));
            }
            println!("{} {}", "Total:".bold(), page.total);
        }

        Commands::Retry {
            job_id,
            api_key,
            dry_run,
            no_skip_duplicates,
        } => {
            let params = json!({
                "job_id": job_id,
                "api_key": api_key,
                "dry_run": dry_run,
                "skip_duplicates": !no_skip_duplicates,
            });
            let result = call_rpc(&cli.rpc_url, "import.retry.v1", params).await?;
            let job: JobSummary = serde_json::from_value(result)?;

            if job.status == "queued" {
                println!("{}", format!("✓ Failed rows of {} requeued", job.id).green().bold());
            } else {
                println!("{}", "○ Nothing to retry".yellow());
            }
            println!();
            print_summary(&job);
        }
    }

    Ok(())
}
