//! Daemon configuration, read once from the environment at startup

use anyhow::{anyhow, bail, Context, Result};
use reelimport_core::domain::profile::DEFAULT_MIN_WATCH_YEAR;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// SQLite file; `None` selects the in-memory store
    pub db_path: Option<PathBuf>,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub record_service_url: String,
    pub catalog_url: String,
    pub remote_dedupe: bool,
    pub min_watch_year: i32,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = get("REELIMPORT_DB_PATH").map(|p| expand_path(&p));

        let record_service_url = get("REELIMPORT_RECORD_SERVICE_URL")
            .ok_or_else(|| anyhow!("REELIMPORT_RECORD_SERVICE_URL is required"))?;
        let catalog_url =
            get("REELIMPORT_CATALOG_URL").unwrap_or_else(|| record_service_url.clone());

        let log_format = match get("REELIMPORT_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("REELIMPORT_LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };

        Ok(Self {
            db_path,
            rpc_host: get("REELIMPORT_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port: parse_or("REELIMPORT_RPC_PORT", get("REELIMPORT_RPC_PORT"), DEFAULT_RPC_PORT)?,
            record_service_url,
            catalog_url,
            remote_dedupe: parse_flag("REELIMPORT_REMOTE_DEDUPE", get("REELIMPORT_REMOTE_DEDUPE"))?,
            min_watch_year: parse_or(
                "REELIMPORT_MIN_WATCH_YEAR",
                get("REELIMPORT_MIN_WATCH_YEAR"),
                DEFAULT_MIN_WATCH_YEAR,
            )?,
            http_timeout: Duration::from_secs(parse_or(
                "REELIMPORT_HTTP_TIMEOUT_SECS",
                get("REELIMPORT_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            log_format,
            log_dir: get("REELIMPORT_LOG_DIR").map(|p| expand_path(&p)),
        })
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, v)),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => bail!("Invalid value for {}: '{}'", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("REELIMPORT_RECORD_SERVICE_URL", "http://records.local/api")]).unwrap();
        assert!(cfg.db_path.is_none());
        assert_eq!(cfg.rpc_host, "127.0.0.1");
        assert_eq!(cfg.rpc_port, 9630);
        assert_eq!(cfg.catalog_url, "http://records.local/api");
        assert!(!cfg.remote_dedupe);
        assert_eq!(cfg.min_watch_year, 2010);
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.log_dir.is_none());
    }

    #[test]
    fn test_record_service_url_required() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("REELIMPORT_RECORD_SERVICE_URL"));

        assert!(config(&[("REELIMPORT_RECORD_SERVICE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("REELIMPORT_RECORD_SERVICE_URL", "http://records.local/api"),
            ("REELIMPORT_CATALOG_URL", "http://catalog.local"),
            ("REELIMPORT_DB_PATH", "/var/lib/reelimport/jobs.db"),
            ("REELIMPORT_RPC_PORT", "9700"),
            ("REELIMPORT_REMOTE_DEDUPE", "TRUE"),
            ("REELIMPORT_MIN_WATCH_YEAR", "2015"),
            ("REELIMPORT_HTTP_TIMEOUT_SECS", "3"),
            ("REELIMPORT_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.db_path, Some(PathBuf::from("/var/lib/reelimport/jobs.db")));
        assert_eq!(cfg.catalog_url, "http://catalog.local");
        assert_eq!(cfg.rpc_port, 9700);
        assert!(cfg.remote_dedupe);
        assert_eq!(cfg.min_watch_year, 2015);
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = ("REELIMPORT_RECORD_SERVICE_URL", "http://records.local");
        assert!(config(&[base, ("REELIMPORT_RPC_PORT", "nine")]).is_err());
        assert!(config(&[base, ("REELIMPORT_REMOTE_DEDUPE", "maybe")]).is_err());
        assert!(config(&[base, ("REELIMPORT_LOG_FORMAT", "xml")]).is_err());
        assert!(config(&[base, ("REELIMPORT_MIN_WATCH_YEAR", "20x0")]).is_err());
    }

    #[test]
    fn test_db_path_tilde_expanded() {
        let cfg = config(&[
            ("REELIMPORT_RECORD_SERVICE_URL", "http://records.local"),
            ("REELIMPORT_DB_PATH", "~/reelimport/jobs.db"),
        ])
        .unwrap();
        let path = cfg.db_path.unwrap();
        assert!(path.ends_with("reelimport/jobs.db"));
        if std::env::var_os("HOME").is_some() {
            assert!(!path.to_string_lossy().starts_with('~'));
        }
    }
}
