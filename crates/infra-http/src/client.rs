// Shared reqwest client setup

use reqwest::Client;
use std::time::Duration;

/// Header carrying the caller's credential downstream
pub const API_KEY_HEADER: &str = "apiKey";

/// Path of the record collection on the downstream service
pub const RECORDS_PATH: &str = "movies";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `{base_url}/{path}` without doubled slashes
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub fn build_client(config: &HttpClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(config.timeout).build()
}
