//! Geographic aggregation - country/state normalization, location explosion
//! and per-region rollups

use crate::analytics::dataset::{Company, Dataset};
use crate::analytics::{mean, median, round_stat};
use crate::ingestion::types::State;
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// ISO 3166-1 alpha-2 codes mapped to the country names choropleth maps expect
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AU", "Australia"),
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("IE", "Ireland"),
    ("SG", "Singapore"),
    ("DE", "Germany"),
    ("CH", "Switzerland"),
    ("IT", "Italy"),
    ("CA", "Canada"),
    ("NZ", "New Zealand"),
    ("BR", "Brazil"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("DK", "Denmark"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("FI", "Finland"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("CN", "China"),
    ("HK", "Hong Kong"),
    ("TW", "Taiwan"),
    ("IN", "India"),
    ("MY", "Malaysia"),
    ("TH", "Thailand"),
    ("ID", "Indonesia"),
    ("PH", "Philippines"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
    ("AE", "United Arab Emirates"),
    ("SA", "Saudi Arabia"),
    ("TR", "Turkey"),
    ("IL", "Israel"),
    ("RU", "Russia"),
    ("PL", "Poland"),
    ("CZ", "Czech Republic"),
    ("HU", "Hungary"),
    ("RO", "Romania"),
    ("AT", "Austria"),
    ("PT", "Portugal"),
    ("GR", "Greece"),
    ("LU", "Luxembourg"),
    ("MX", "Mexico"),
    ("AR", "Argentina"),
    ("CL", "Chile"),
    ("CO", "Colombia"),
    ("PE", "Peru"),
    ("EG", "Egypt"),
    ("MA", "Morocco"),
    ("QA", "Qatar"),
    ("BH", "Bahrain"),
    ("KW", "Kuwait"),
    ("OM", "Oman"),
    ("LB", "Lebanon"),
    ("JO", "Jordan"),
    ("UA", "Ukraine"),
    ("RS", "Serbia"),
    ("HR", "Croatia"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("BG", "Bulgaria"),
    ("LT", "Lithuania"),
    ("LV", "Latvia"),
    ("EE", "Estonia"),
    ("CY", "Cyprus"),
    ("MT", "Malta"),
    ("IS", "Iceland"),
    ("AM", "Armenia"),
    ("KZ", "Kazakhstan"),
    ("UY", "Uruguay"),
    ("DO", "Dominican Republic"),
    ("CR", "Costa Rica"),
    ("PA", "Panama"),
    ("TT", "Trinidad and Tobago"),
    ("JM", "Jamaica"),
    ("BS", "Bahamas"),
    ("BB", "Barbados"),
    ("PS", "Palestine"),
    ("LK", "Sri Lanka"),
    ("BD", "Bangladesh"),
    ("PK", "Pakistan"),
    ("NP", "Nepal"),
    ("MM", "Myanmar"),
    ("KH", "Cambodia"),
    ("LA", "Laos"),
    ("BN", "Brunei"),
    ("MO", "Macau"),
    ("MV", "Maldives"),
    ("FJ", "Fiji"),
    ("PG", "Papua New Guinea"),
    ("YE", "Yemen"),
];

pub const AUSTRALIA: &str = "Australia";

/// Display name for a country code; unknown codes pass through unchanged
pub fn country_name(code: &str) -> String {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Australian state boundaries and their code -> name mapping
#[derive(Debug, Clone)]
pub struct GeoReference {
    state_names: BTreeMap<String, String>,
    geojson: GeoJson,
}

impl GeoReference {
    /// Eight states with their names and no geometry
    pub fn builtin() -> Self {
        let features = State::ALL
            .iter()
            .map(|state| {
                let mut properties = JsonObject::new();
                properties.insert("STATE_CODE".to_string(), Value::from(state.code()));
                properties.insert("STATE_NAME".to_string(), Value::from(state.name()));
                Feature {
                    bbox: None,
                    geometry: None,
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        Self::from_geojson(GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }))
    }

    pub fn from_geojson(geojson: GeoJson) -> Self {
        let mut state_names = BTreeMap::new();

        if let GeoJson::FeatureCollection(collection) = &geojson {
            for feature in &collection.features {
                let Some(properties) = &feature.properties else {
                    continue;
                };
                let code = properties.get("STATE_CODE").and_then(property_text);
                let name = properties.get("STATE_NAME").and_then(property_text);
                if let (Some(code), Some(name)) = (code, name) {
                    state_names.insert(code, name);
                }
            }
        }

        Self {
            state_names,
            geojson,
        }
    }

    /// Read a state boundaries file, falling back to the built-in reference when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "State boundaries {:?} not found, using built-in state reference",
                path
            );
            return Ok(Self::builtin());
        }

        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let geojson: GeoJson = text
            .parse()
            .with_context(|| format!("Invalid GeoJSON in {:?}", path))?;

        let reference = Self::from_geojson(geojson);
        info!(
            "Loaded {} state names from {:?}",
            reference.state_names.len(),
            path
        );
        Ok(reference)
    }

    pub fn state_name(&self, code: &str) -> Option<&str> {
        self.state_names.get(code).map(String::as_str)
    }

    pub fn geojson(&self) -> &GeoJson {
        &self.geojson
    }
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A single office location extracted from a company's `locations` cell
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub country: String,
    pub state: Option<String>,
}

/// Parse a `locations` cell. Missing, malformed or non-array JSON yields no locations;
/// array elements without a string `country` are skipped.
pub fn extract_locations(cell: Option<&str>) -> Vec<Location> {
    let Some(text) = cell else {
        return Vec::new();
    };

    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Vec::new(),
        Err(_) => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let object = item.as_object()?;
            let country = object.get("country")?.as_str()?;
            let state = object
                .get("state")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(Location {
                country: country_name(country),
                state,
            })
        })
        .collect()
}

/// One row per (company, location); companies without locations drop out
pub fn explode_locations(dataset: &Dataset) -> Vec<(&Company, Location)> {
    dataset
        .companies
        .iter()
        .flat_map(|company| {
            extract_locations(company.locations.as_deref())
                .into_iter()
                .map(move |location| (company, location))
        })
        .collect()
}

#[derive(Debug, Default)]
struct RegionAccumulator {
    named: usize,
    followers: Vec<f64>,
    sizes: Vec<f64>,
    years: Vec<f64>,
}

impl RegionAccumulator {
    fn add(&mut self, company: &Company) {
        if company.name.is_some() {
            self.named += 1;
        }
        self.followers.extend(company.follower_count);
        self.sizes.extend(company.company_size_on_linkedin);
        self.years.extend(company.founded_year);
    }

    fn stats(&self) -> RegionStats {
        RegionStats {
            company_count: self.named,
            avg_follower_count: round_stat(mean(&self.followers)),
            avg_company_size: round_stat(mean(&self.sizes)),
            median_founding_year: round_stat(median(&self.years)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionStats {
    pub company_count: usize,
    pub avg_follower_count: i64,
    pub avg_company_size: i64,
    pub median_founding_year: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRollup {
    pub country: String,
    #[serde(flatten)]
    pub stats: RegionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRollup {
    pub state_code: String,
    pub state_name: Option<String>,
    #[serde(flatten)]
    pub stats: RegionStats,
}

/// Per-country statistics over the exploded locations, sorted by country name
pub fn country_rollups(rows: &[(&Company, Location)]) -> Vec<CountryRollup> {
    let mut groups: BTreeMap<&str, RegionAccumulator> = BTreeMap::new();

    for (company, location) in rows {
        groups
            .entry(location.country.as_str())
            .or_default()
            .add(company);
    }

    groups
        .into_iter()
        .map(|(country, acc)| CountryRollup {
            country: country.to_string(),
            stats: acc.stats(),
        })
        .collect()
}

/// Per-state statistics for Australian locations whose state label resolves, sorted by state code
pub fn australia_state_rollups(
    rows: &[(&Company, Location)],
    reference: &GeoReference,
) -> Vec<StateRollup> {
    let mut groups: BTreeMap<&'static str, RegionAccumulator> = BTreeMap::new();

    for (company, location) in rows {
        if location.country != AUSTRALIA {
            continue;
        }
        let Some(state) = location.state.as_deref().and_then(State::from_label) else {
            continue;
        };
        groups.entry(state.code()).or_default().add(company);
    }

    groups
        .into_iter()
        .map(|(code, acc)| StateRollup {
            state_code: code.to_string(),
            state_name: reference.state_name(code).map(str::to_string),
            stats: acc.stats(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct GeographicalDistribution<'a> {
    pub countries: Vec<CountryRollup>,
    pub australia_states: Vec<StateRollup>,
    pub australia_geojson: &'a GeoJson,
}

pub fn geographical_distribution<'a>(
    dataset: &Dataset,
    reference: &'a GeoReference,
) -> GeographicalDistribution<'a> {
    let rows = explode_locations(dataset);

    GeographicalDistribution {
        countries: country_rollups(&rows),
        australia_states: australia_state_rollups(&rows, reference),
        australia_geojson: reference.geojson(),
    }
}
