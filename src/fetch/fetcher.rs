use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use utoipa::ToSchema;

use super::error::FetchError;
use super::report::SceneReport;
use crate::catalog::{BoundingBox, CatalogClient, Satellite, SearchWindow};
use crate::config::{CatalogConfig, Config, SearchDefaults};
use crate::download::Downloader;
use crate::geocode::{Geocoder, Location};
use crate::select::{select_scene, SelectionResult};

const MAX_DAY_WINDOW: u32 = 365;

/// One direct-download request. Coordinates win over `place` when both are given.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FetchRequest {
    pub satellite: Satellite,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub place: Option<String>,
    #[schema(value_type = String, format = Date, example = "2023-06-02")]
    pub date: NaiveDate,
    #[serde(default)]
    pub day_window: Option<u32>,
    #[serde(default)]
    pub cloud_ceiling: Option<f64>,
    #[serde(default)]
    pub bbox_offset: Option<f64>,
    #[serde(default)]
    pub bands: Option<Vec<String>>,
}

impl FetchRequest {
    pub fn at(satellite: Satellite, lat: f64, lon: f64, date: NaiveDate) -> Self {
        Self {
            satellite,
            lat: Some(lat),
            lon: Some(lon),
            place: None,
            date,
            day_window: None,
            cloud_ceiling: None,
            bbox_offset: None,
            bands: None,
        }
    }
}

/// Runs geocode, search, selection and download for a single request.
pub struct SceneFetcher {
    geocoder: Geocoder,
    catalog: CatalogClient,
    downloader: Downloader,
    collections: CatalogConfig,
    defaults: SearchDefaults,
    destination_dir: PathBuf,
}

impl SceneFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let geocoder = Geocoder::new(&config.geocoder)?;
        let catalog = CatalogClient::new(&config.catalog)?;
        let downloader = Downloader::new(&config.download)
            .map_err(|e| FetchError::ServiceUnavailable(e.to_string()))?;
        Ok(Self {
            geocoder,
            catalog,
            downloader,
            collections: config.catalog.clone(),
            defaults: config.search,
            destination_dir: config.storage.destination_dir.clone(),
        })
    }

    pub fn defaults(&self) -> &SearchDefaults {
        &self.defaults
    }

    pub async fn geocode(&self, place: &str) -> Result<Location, FetchError> {
        Ok(self.geocoder.resolve(place, None).await?)
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<SceneReport, FetchError> {
        let day_window = request.day_window.unwrap_or(self.defaults.day_window);
        if day_window == 0 || day_window > MAX_DAY_WINDOW {
            return Err(FetchError::InvalidInput(format!(
                "day window must be within 1..={MAX_DAY_WINDOW}"
            )));
        }
        let cloud_ceiling = request.cloud_ceiling.unwrap_or(self.defaults.cloud_ceiling);
        if !(0.0..=100.0).contains(&cloud_ceiling) {
            return Err(FetchError::InvalidInput(
                "cloud ceiling must be within 0..=100".into(),
            ));
        }
        let offset = request.bbox_offset.unwrap_or(self.defaults.bbox_offset);

        let (lat, lon, location) = match (request.lat, request.lon, request.place.as_deref()) {
            (Some(lat), Some(lon), _) => (lat, lon, None),
            (None, None, Some(place)) => {
                let location = self.geocode(place).await?;
                (location.latitude, location.longitude, Some(location))
            }
            _ => {
                return Err(FetchError::InvalidInput(
                    "either lat and lon or a place name is required".into(),
                ))
            }
        };

        let bbox = BoundingBox::around(lat, lon, offset)?;
        let window = SearchWindow::around(request.date, day_window)?;
        let collection = request.satellite.collection(&self.collections);

        let records = self.catalog.search(&collection.id, &bbox, &window).await?;

        let (record, day_distance) =
            match select_scene(&records, request.date, &collection, cloud_ceiling) {
                SelectionResult::Selected {
                    record,
                    day_distance,
                } => (record, day_distance),
                SelectionResult::Empty(reason) => {
                    log::info!(
                        "No {} scene among {} candidates: {}",
                        request.satellite,
                        records.len(),
                        reason.describe()
                    );
                    return Err(FetchError::NoEligibleScene(reason));
                }
            };

        log::info!(
            "Selected {} acquired {} ({} day(s) from target, cloud {:?})",
            record.id,
            record.acquired,
            day_distance,
            record.cloud_cover
        );

        let bands: Vec<String> = match &request.bands {
            Some(bands) if !bands.is_empty() => bands.clone(),
            _ => request
                .satellite
                .default_bands()
                .iter()
                .map(|b| b.to_string())
                .collect(),
        };

        let outcome = self
            .downloader
            .fetch_bands(record, &bands, &self.destination_dir)
            .await;

        Ok(SceneReport {
            satellite: request.satellite,
            scene_id: record.id.clone(),
            collection: record.collection.clone(),
            acquired: record.acquired,
            cloud_cover: record.cloud_cover,
            target_date: request.date,
            day_distance,
            candidates: records.len(),
            location,
            bbox,
            bands: outcome.bands,
        })
    }
}
