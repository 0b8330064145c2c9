//! Core data types for the ingestion pipeline
//! Pure data structures with no behavior beyond formatting and lookups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Australian states and territories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    NSW,
    VIC,
    QLD,
    WA,
    SA,
    TAS,
    ACT,
    NT,
}

impl State {
    pub const ALL: [State; 8] = [
        State::NSW,
        State::VIC,
        State::QLD,
        State::SA,
        State::WA,
        State::TAS,
        State::NT,
        State::ACT,
    ];

    /// ABS state code, as used by the `STATE_CODE` property of the state boundaries GeoJSON
    pub fn code(&self) -> &'static str {
        match self {
            State::NSW => "1",
            State::VIC => "2",
            State::QLD => "3",
            State::SA => "4",
            State::WA => "5",
            State::TAS => "6",
            State::NT => "7",
            State::ACT => "8",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::NSW => "New South Wales",
            State::VIC => "Victoria",
            State::QLD => "Queensland",
            State::SA => "South Australia",
            State::WA => "Western Australia",
            State::TAS => "Tasmania",
            State::NT => "Northern Territory",
            State::ACT => "Australian Capital Territory",
        }
    }

    /// Resolve a free-text state label from a location record.
    /// Accepts abbreviations and full names, ignoring case, surrounding
    /// whitespace and trailing commas ("New South Wales," shows up in the wild).
    pub fn from_label(label: &str) -> Option<State> {
        let cleaned = label.trim().trim_end_matches(',').trim();
        if cleaned.is_empty() {
            return None;
        }

        State::ALL.into_iter().find(|state| {
            cleaned.eq_ignore_ascii_case(&state.to_string())
                || cleaned.eq_ignore_ascii_case(state.name())
        })
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::NSW => write!(f, "NSW"),
            State::VIC => write!(f, "VIC"),
            State::QLD => write!(f, "QLD"),
            State::WA => write!(f, "WA"),
            State::SA => write!(f, "SA"),
            State::TAS => write!(f, "TAS"),
            State::ACT => write!(f, "ACT"),
            State::NT => write!(f, "NT"),
        }
    }
}

/// Outcome of enriching a single company, as written to the `Status` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Fetched,
    UrlNotFound,
    FetchFailed,
}

impl EnrichmentStatus {
    /// Default text for the `Error Details` column
    pub fn default_details(&self) -> Option<&'static str> {
        match self {
            EnrichmentStatus::Fetched => None,
            EnrichmentStatus::UrlNotFound => Some("Company LinkedIn profile not found"),
            EnrichmentStatus::FetchFailed => Some("API request failed or returned no data"),
        }
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentStatus::Fetched => write!(f, "Data fetched successfully"),
            EnrichmentStatus::UrlNotFound => write!(f, "URL not found"),
            EnrichmentStatus::FetchFailed => write!(f, "Data fetch failed"),
        }
    }
}

/// Nearby places found around one geocoded company
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSurvey {
    pub company: String,
    pub latitude: f64,
    pub longitude: f64,
    pub malls: Vec<String>,
    pub restaurants: Vec<String>,
    pub bus_stations: Vec<String>,
    pub train_stations: Vec<String>,
}

/// Ingestion run statistics
#[derive(Debug, Clone)]
pub struct IngestionStats {
    pub started_at: DateTime<Utc>,
    pub fetched: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl IngestionStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            fetched: 0,
            not_found: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn record(&mut self, status: EnrichmentStatus) {
        match status {
            EnrichmentStatus::Fetched => self.fetched += 1,
            EnrichmentStatus::UrlNotFound => self.not_found += 1,
            EnrichmentStatus::FetchFailed => self.failed += 1,
        }
    }
}

impl Default for IngestionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IngestionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        write!(
            f,
            "fetched: {}, not found: {}, failed: {}, skipped: {} ({}s)",
            self.fetched,
            self.not_found,
            self.failed,
            self.skipped,
            elapsed.num_seconds()
        )
    }
}
