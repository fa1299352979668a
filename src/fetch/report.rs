use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::catalog::{BoundingBox, Satellite};
use crate::download::{BandOutcome, BandResult};
use crate::geocode::Location;

/// Outcome of one fetch request: which scene was chosen and what happened to each band.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SceneReport {
    pub satellite: Satellite,
    pub scene_id: String,
    pub collection: String,
    pub acquired: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    pub target_date: NaiveDate,
    pub day_distance: u32,
    pub candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub bbox: BoundingBox,
    pub bands: Vec<BandOutcome>,
}

impl SceneReport {
    pub fn saved_count(&self) -> usize {
        self.bands.iter().filter(|b| b.saved().is_some()).count()
    }
}

impl fmt::Display for SceneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} scene {}", self.satellite, self.scene_id)?;
        if let Some(location) = &self.location {
            writeln!(f, "  location: {}", location.address)?;
        }
        writeln!(
            f,
            "  acquired: {} ({} day(s) from {})",
            self.acquired.to_rfc3339(),
            self.day_distance,
            self.target_date
        )?;
        if let Some(cover) = self.cloud_cover {
            writeln!(f, "  cloud cover: {cover:.1}%")?;
        }
        for band in &self.bands {
            match &band.result {
                BandResult::Saved(saved) => writeln!(
                    f,
                    "  {}: {} ({} bytes)",
                    band.band.to_uppercase(),
                    saved.path.display(),
                    saved.bytes
                )?,
                BandResult::Failed { error } => {
                    writeln!(f, "  {}: failed, {}", band.band.to_uppercase(), error)?
                }
            }
        }
        write!(
            f,
            "  {} of {} band(s) saved",
            self.saved_count(),
            self.bands.len()
        )
    }
}
