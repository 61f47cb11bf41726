// Title Catalog Port (remote duplicate lookup)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

/// Lists titles of records that already exist downstream
#[async_trait]
pub trait TitleCatalog: Send + Sync {
    async fn existing_titles(&self, credential: &str) -> Result<Vec<String>, CatalogError>;
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Static title list, or a failure, counting fetches
    pub struct MockTitleCatalog {
        titles: Option<Vec<String>>,
        fetches: AtomicUsize,
    }

    impl MockTitleCatalog {
        pub fn with_titles<I, S>(titles: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                titles: Some(titles.into_iter().map(Into::into).collect()),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                titles: None,
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TitleCatalog for MockTitleCatalog {
        async fn existing_titles(&self, _credential: &str) -> Result<Vec<String>, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.titles
                .clone()
                .ok_or_else(|| CatalogError::Unavailable("connection refused".to_string()))
        }
    }
}
