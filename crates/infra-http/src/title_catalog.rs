// HTTP TitleCatalog Implementation

use crate::client::{build_client, HttpClientConfig, API_KEY_HEADER, RECORDS_PATH};
use async_trait::async_trait;
use reelimport_core::port::{CatalogError, TitleCatalog};
use reqwest::Client;
use serde::Deserialize;

/// Lists existing record titles with `GET {base_url}/movies`
pub struct HttpTitleCatalog {
    url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    title: Option<String>,
}

impl HttpTitleCatalog {
    pub fn new(config: &HttpClientConfig) -> Result<Self, CatalogError> {
        let client = build_client(config).map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(Self {
            url: config.endpoint(RECORDS_PATH),
            client,
        })
    }
}

#[async_trait]
impl TitleCatalog for HttpTitleCatalog {
    async fn existing_titles(&self, credential: &str) -> Result<Vec<String>, CatalogError> {
        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, credential)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!(
                "Catalog returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        parse_titles(&body)
    }
}

/// Non-blank titles of a JSON array of records; entries without a string
/// `title` are ignored
pub(crate) fn parse_titles(body: &str) -> Result<Vec<String>, CatalogError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<CatalogEntry>(entry).ok())
        .filter_map(|entry| entry.title)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}
