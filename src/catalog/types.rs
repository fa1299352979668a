use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::error::CatalogError;
use crate::config::CatalogConfig;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, clap::ValueEnum,
    strum_macros::Display,
)]
pub enum Satellite {
    #[serde(rename = "sentinel-1")]
    #[strum(to_string = "sentinel-1")]
    #[value(name = "sentinel-1")]
    Sentinel1,
    #[serde(rename = "sentinel-2")]
    #[strum(to_string = "sentinel-2")]
    #[value(name = "sentinel-2")]
    Sentinel2,
}

impl Satellite {
    pub fn kind(&self) -> ImageryKind {
        match self {
            Satellite::Sentinel1 => ImageryKind::Sar,
            Satellite::Sentinel2 => ImageryKind::Optical,
        }
    }

    /// Bands fetched when a request does not name any.
    pub fn default_bands(&self) -> &'static [&'static str] {
        match self {
            Satellite::Sentinel1 => &["vv", "vh"],
            Satellite::Sentinel2 => &["visual", "red", "green", "blue"],
        }
    }

    pub fn collection(&self, config: &CatalogConfig) -> CollectionRef {
        let id = match self {
            Satellite::Sentinel1 => &config.sar_collection,
            Satellite::Sentinel2 => &config.optical_collection,
        };
        CollectionRef {
            id: id.clone(),
            kind: self.kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageryKind {
    Sar,
    Optical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub id: String,
    pub kind: ImageryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Square box of `offset_deg` around the center, clamped to valid coordinates.
    pub fn around(lat: f64, lon: f64, offset_deg: f64) -> Result<Self, CatalogError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CatalogError::InvalidInput(format!(
                "latitude {lat} outside -90..90"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(CatalogError::InvalidInput(format!(
                "longitude {lon} outside -180..180"
            )));
        }
        if !offset_deg.is_finite() || offset_deg < 0.0 {
            return Err(CatalogError::InvalidInput(format!(
                "bbox offset {offset_deg} must be non-negative"
            )));
        }

        Ok(Self {
            min_lat: (lat - offset_deg).max(-90.0),
            max_lat: (lat + offset_deg).min(90.0),
            min_lon: (lon - offset_deg).max(-180.0),
            max_lon: (lon + offset_deg).min(180.0),
        })
    }

    /// STAC order: west, south, east, north.
    pub fn to_stac(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SearchWindow {
    pub center: NaiveDate,
    pub days: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SearchWindow {
    pub fn around(center: NaiveDate, days: u32) -> Result<Self, CatalogError> {
        let span = Duration::days(i64::from(days));
        let first = center
            .checked_sub_signed(span)
            .ok_or_else(|| CatalogError::InvalidInput(format!("window of {days} days too wide")))?;
        let last = center
            .checked_add_signed(span)
            .ok_or_else(|| CatalogError::InvalidInput(format!("window of {days} days too wide")))?;

        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        Ok(Self {
            center,
            days,
            start: Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN)),
            end: Utc.from_utc_datetime(&last.and_time(end_of_day)),
        })
    }

    /// Closed interval as accepted by the STAC `datetime` parameter.
    pub fn to_stac(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Asset {
    pub href: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// One catalog item, as returned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SceneRecord {
    pub id: String,
    pub collection: String,
    pub acquired: DateTime<Utc>,
    pub cloud_cover: Option<f64>,
    pub assets: BTreeMap<String, Asset>,
}

impl SceneRecord {
    /// Decodes a STAC feature. Items lacking an id or any acquisition time yield `None`.
    pub fn from_feature(feature: &serde_json::Value) -> Option<Self> {
        let id = feature.get("id")?.as_str()?.to_string();
        let properties = feature.get("properties")?;

        let acquired = ["datetime", "start_datetime"]
            .iter()
            .filter_map(|key| properties.get(*key).and_then(|v| v.as_str()))
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))?;

        let collection = feature
            .get("collection")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let cloud_cover = properties.get("eo:cloud_cover").and_then(|v| v.as_f64());

        let assets = feature
            .get("assets")
            .and_then(|a| a.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(name, value)| {
                        serde_json::from_value::<Asset>(value.clone())
                            .ok()
                            .map(|asset| (name.clone(), asset))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            collection,
            acquired,
            cloud_cover,
            assets,
        })
    }

    /// Looks up an asset by exact key, then case-insensitively.
    pub fn asset(&self, band: &str) -> Option<(&str, &Asset)> {
        if let Some((key, asset)) = self.assets.get_key_value(band) {
            return Some((key.as_str(), asset));
        }
        self.assets
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(band))
            .map(|(key, asset)| (key.as_str(), asset))
    }
}
