// Duplicate Resolver - in-file and remote title sets for one pass

use crate::domain::{RowErrorCode, RowRejection};
use crate::port::TitleCatalog;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Comparison key: trimmed, case-folded title
pub fn dedupe_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Where a duplicate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    InFile,
    Remote,
}

impl DuplicateSource {
    pub fn rejection(&self) -> RowRejection {
        match self {
            DuplicateSource::InFile => RowRejection::new(
                RowErrorCode::DuplicateInFile,
                "Duplicate title in this upload",
            ),
            DuplicateSource::Remote => RowRejection::new(
                RowErrorCode::DuplicateRemote,
                "Title already exists in the remote catalog",
            ),
        }
    }
}

/// Per-pass duplicate state.
///
/// `seen_in_file` holds titles accepted earlier in the same pass. `remote`
/// is the catalog snapshot, loaded once; `None` means remote dedupe is off
/// or the catalog could not be read.
#[derive(Debug, Default)]
pub struct DedupeResolver {
    seen_in_file: HashSet<String>,
    remote: Option<HashSet<String>>,
}

impl DedupeResolver {
    /// File-only resolver
    pub fn in_file_only() -> Self {
        Self::default()
    }

    pub fn with_remote_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            seen_in_file: HashSet::new(),
            remote: Some(titles.into_iter().map(|t| dedupe_key(t.as_ref())).collect()),
        }
    }

    /// Snapshot the catalog once per pass. A failed fetch degrades to
    /// file-only dedupe and never fails the pass.
    pub async fn load(catalog: &dyn TitleCatalog, credential: &str, remote_enabled: bool) -> Self {
        if !remote_enabled {
            return Self::in_file_only();
        }

        match catalog.existing_titles(credential).await {
            Ok(titles) => {
                debug!(count = titles.len(), "Loaded remote title snapshot");
                Self::with_remote_titles(titles)
            }
            Err(e) => {
                warn!(error = %e, "Remote title lookup failed, using in-file dedupe only");
                Self::in_file_only()
            }
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// In-file duplicates take precedence over remote ones
    pub fn check(&self, title: &str) -> Option<DuplicateSource> {
        let key = dedupe_key(title);
        if self.seen_in_file.contains(&key) {
            return Some(DuplicateSource::InFile);
        }
        match &self.remote {
            Some(remote) if remote.contains(&key) => Some(DuplicateSource::Remote),
            _ => None,
        }
    }

    /// Title passed the check in this pass
    pub fn accept(&mut self, title: &str) {
        self.seen_in_file.insert(dedupe_key(title));
    }

    /// Downstream record now exists
    pub fn record_created(&mut self, title: &str) {
        if let Some(remote) = self.remote.as_mut() {
            remote.insert(dedupe_key(title));
        }
    }
}
