// Reelimport Infrastructure - HTTP Adapters
// Implements: RecordService, TitleCatalog

mod client;
mod record_service;
mod title_catalog;

pub use client::{build_client, HttpClientConfig, API_KEY_HEADER};
pub use record_service::HttpRecordService;
pub use title_catalog::HttpTitleCatalog;
