//! Location survey - geocode companies and count nearby points of interest

use crate::ingestion::types::LocationSurvey;
use crate::ingestion::write::SheetTable;
use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_MAPS_URL: &str = "https://maps.googleapis.com/maps/api";
pub const NEARBY_RADIUS_M: u32 = 1000;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
}

/// Geocoding and nearby-places client
#[derive(Clone)]
pub struct GoogleMapsClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    /// Pause after each request made by one worker
    pub request_pause: Duration,
}

impl GoogleMapsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_pause: Duration::from_millis(500),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Latitude/longitude of "{company}, Australia", if the geocoder finds it
    pub async fn geocode_company(&self, company_name: &str) -> Result<Option<(f64, f64)>> {
        let address = format!("{}, Australia", company_name);
        let response: GeocodeResponse = self
            .http_client
            .get(self.url("geocode/json"))
            .query(&[("address", address.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            debug!("Geocoder returned {} for {}", response.status, company_name);
            return Ok(None);
        }

        Ok(response
            .results
            .first()
            .map(|r| (r.geometry.location.lat, r.geometry.location.lng)))
    }

    /// Names of places of `place_type` within 1km
    pub async fn nearby_places(&self, lat: f64, lng: f64, place_type: &str) -> Result<Vec<String>> {
        let location = format!("{},{}", lat, lng);
        let radius = NEARBY_RADIUS_M.to_string();
        let response: NearbyResponse = self
            .http_client
            .get(self.url("place/nearbysearch/json"))
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", place_type),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.into_iter().map(|p| p.name).collect())
    }

    async fn survey_company(&self, company: &str) -> Result<Option<LocationSurvey>> {
        let Some((latitude, longitude)) = self.geocode_company(company).await? else {
            return Ok(None);
        };
        tokio::time::sleep(self.request_pause).await;

        let mut found: Vec<Vec<String>> = Vec::with_capacity(4);
        for place_type in ["shopping_mall", "restaurant", "bus_station", "train_station"] {
            found.push(self.nearby_places(latitude, longitude, place_type).await?);
            tokio::time::sleep(self.request_pause).await;
        }

        let train_stations = found.pop().unwrap_or_default();
        let bus_stations = found.pop().unwrap_or_default();
        let restaurants = found.pop().unwrap_or_default();
        let malls = found.pop().unwrap_or_default();

        Ok(Some(LocationSurvey {
            company: company.to_string(),
            latitude,
            longitude,
            malls,
            restaurants,
            bus_stations,
            train_stations,
        }))
    }
}

/// Survey every company with at most `workers` in flight.
/// Results keep the input order; companies that cannot be geocoded are left out.
pub async fn survey_locations(
    client: &GoogleMapsClient,
    companies: &[String],
    workers: usize,
) -> Vec<LocationSurvey> {
    info!(
        "Surveying {} companies with {} workers",
        companies.len(),
        workers.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, company) in companies.iter().cloned().enumerate() {
        let client = client.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            info!("Processing {}...", company);
            let result = client.survey_company(&company).await;
            (idx, company, result)
        });
    }

    let mut surveys = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, _, Ok(Some(survey)))) => {
                info!(
                    "Added {} with {} nearby malls, {} nearby restaurants, {} nearby bus stations, and {} nearby train stations",
                    survey.company,
                    survey.malls.len(),
                    survey.restaurants.len(),
                    survey.bus_stations.len(),
                    survey.train_stations.len()
                );
                surveys.push((idx, survey));
            }
            Ok((_, company, Ok(None))) => warn!("Couldn't find location for {}", company),
            Ok((_, company, Err(e))) => warn!("Location survey failed for {}: {}", company, e),
            Err(e) => warn!("Survey task failed: {}", e),
        }
    }

    surveys.sort_by_key(|(idx, _)| *idx);
    surveys.into_iter().map(|(_, survey)| survey).collect()
}

/// Tabulate surveys with counts and comma-joined names per place category
pub fn surveys_to_table(surveys: &[LocationSurvey]) -> SheetTable {
    let headers = [
        "Company",
        "Latitude",
        "Longitude",
        "Nearby Malls",
        "Nearby Restaurants",
        "Nearby Bus Stations",
        "Nearby Train Stations",
        "Mall Names",
        "Restaurant Names",
        "Bus Station Names",
        "Train Station Names",
    ];

    let rows = surveys
        .iter()
        .map(|s| {
            vec![
                Some(s.company.clone()),
                Some(s.latitude.to_string()),
                Some(s.longitude.to_string()),
                Some(s.malls.len().to_string()),
                Some(s.restaurants.len().to_string()),
                Some(s.bus_stations.len().to_string()),
                Some(s.train_stations.len().to_string()),
                Some(s.malls.join(", ")),
                Some(s.restaurants.join(", ")),
                Some(s.bus_stations.join(", ")),
                Some(s.train_stations.join(", ")),
            ]
        })
        .collect();

    SheetTable::from_rows(headers.iter().map(|h| h.to_string()).collect(), rows)
}
