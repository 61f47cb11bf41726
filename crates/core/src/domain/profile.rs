// Import Profile - per-deployment CSV instantiation

use crate::domain::job::ImportType;

/// Default floor year of the watch-date algorithm
pub const DEFAULT_MIN_WATCH_YEAR: i32 = 2010;

/// Describes one supported import kind: which columns must exist and which
/// columns feed the canonical item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProfile {
    pub import_type: ImportType,
    /// Provenance tag recorded on every job
    pub source_system: String,
    /// Ordered list of columns that must be present in the header
    pub required_headers: Vec<String>,
    pub title_column: String,
    pub year_column: String,
    pub source_link_column: String,
    /// Optional column carrying an explicit watch date (YYYY-MM-DD)
    pub watch_date_column: Option<String>,
    pub min_watch_year: i32,
}

impl ImportProfile {
    /// Letterboxd "watched"/"diary" export -> movie records
    pub fn letterboxd_movies() -> Self {
        Self {
            import_type: ImportType::movies(),
            source_system: "letterboxd".to_string(),
            required_headers: vec![
                "Date".to_string(),
                "Name".to_string(),
                "Year".to_string(),
                "Letterboxd URI".to_string(),
            ],
            title_column: "Name".to_string(),
            year_column: "Year".to_string(),
            source_link_column: "Letterboxd URI".to_string(),
            watch_date_column: Some("Watched Date".to_string()),
            min_watch_year: DEFAULT_MIN_WATCH_YEAR,
        }
    }

    pub fn with_min_watch_year(mut self, min_watch_year: i32) -> Self {
        self.min_watch_year = min_watch_year;
        self
    }

    pub fn supports(&self, import_type: &ImportType) -> bool {
        &self.import_type == import_type
    }
}
