use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use utoipa::ToSchema;

use super::error::GeocodeError;
use crate::config::GeocoderConfig;

const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Location {
    pub query: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Resolves free-text place names through a Nominatim-compatible service.
///
/// Public Nominatim allows about one request per second, so calls through the
/// same `Geocoder` are spaced by `min_interval` no matter how many tasks share it.
pub struct Geocoder {
    client: Client,
    search_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            search_url: format!("{}/search", config.url.trim_end_matches('/')),
            min_interval: config.min_interval,
            last_call: Mutex::new(None),
        })
    }

    pub async fn resolve(
        &self,
        place: &str,
        country_codes: Option<&str>,
    ) -> Result<Location, GeocodeError> {
        let query = place.trim();
        if query.is_empty() {
            return Err(GeocodeError::InvalidInput);
        }

        let places = match self.lookup(query, country_codes).await {
            Err(GeocodeError::ServiceUnavailable(reason)) => {
                log::warn!("Geocoding '{}' failed ({}), retrying once", query, reason);
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.lookup(query, country_codes).await?
            }
            other => other?,
        };

        let best = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

        let latitude = parse_coordinate(&best.lat)?;
        let longitude = parse_coordinate(&best.lon)?;
        log::info!("Geocoded '{}' to {}, {}", query, latitude, longitude);

        Ok(Location {
            query: query.to_string(),
            latitude,
            longitude,
            address: best.display_name,
        })
    }

    async fn lookup(
        &self,
        query: &str,
        country_codes: Option<&str>,
    ) -> Result<Vec<Place>, GeocodeError> {
        self.wait_turn().await;

        let mut params = vec![("q", query), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = country_codes.filter(|c| !c.trim().is_empty()) {
            params.push(("countrycodes", codes));
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(GeocodeError::ServiceUnavailable(
                "rate limited by geocoding service".into(),
            )),
            other => Err(GeocodeError::ServiceUnavailable(format!(
                "geocoding service returned {other}"
            ))),
        }
    }

    async fn wait_turn(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            sleep_until(previous + self.min_interval).await;
        }
        *last_call = Some(Instant::now());
    }
}

fn parse_coordinate(raw: &str) -> Result<f64, GeocodeError> {
    raw.trim().parse().map_err(|_| {
        GeocodeError::ServiceUnavailable(format!("malformed coordinate '{raw}' in response"))
    })
}
