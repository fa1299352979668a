use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::conversation::AgentEvent;
use super::llm::{ToolCall, ToolFunction, ToolSpec};
use crate::catalog::Satellite;
use crate::download::BandResult;
use crate::fetch::{FetchError, FetchRequest, SceneFetcher, SceneReport};

pub const GEOCODE_LOCATION: &str = "geocode_location";
pub const DOWNLOAD_SENTINEL1: &str = "download_sentinel1";
pub const DOWNLOAD_SENTINEL2: &str = "download_sentinel2";

#[derive(Debug, Deserialize)]
struct GeocodeArgs {
    location_query: String,
}

#[derive(Debug, Deserialize)]
struct DownloadArgs {
    lat: f64,
    lon: f64,
    date: NaiveDate,
    #[serde(default)]
    day_window: Option<u32>,
    #[serde(default)]
    cloud_ceiling: Option<f64>,
}

pub fn tool_specs() -> Vec<ToolSpec> {
    let coordinates = json!({
        "lat": { "type": "number", "description": "Latitude in decimal degrees (-90..90)" },
        "lon": { "type": "number", "description": "Longitude in decimal degrees (-180..180)" },
        "date": { "type": "string", "description": "Target date, YYYY-MM-DD" },
        "day_window": { "type": "integer", "description": "Days searched on each side of the date (default 10)" }
    });
    let mut optical = coordinates.clone();
    optical["cloud_ceiling"] = json!({
        "type": "number",
        "description": "Maximum cloud cover percentage, 0..100 (default 20)"
    });

    vec![
        function(
            GEOCODE_LOCATION,
            "Convert a place name or address into latitude and longitude.",
            json!({
                "type": "object",
                "properties": {
                    "location_query": { "type": "string", "description": "Place name or address" }
                },
                "required": ["location_query"]
            }),
        ),
        function(
            DOWNLOAD_SENTINEL1,
            "Download the Sentinel-1 SAR (VV, VH) scene closest to a date. Works through clouds and at night.",
            json!({
                "type": "object",
                "properties": coordinates,
                "required": ["lat", "lon", "date"]
            }),
        ),
        function(
            DOWNLOAD_SENTINEL2,
            "Download the Sentinel-2 optical scene closest to a date whose cloud cover is under the ceiling.",
            json!({
                "type": "object",
                "properties": optical,
                "required": ["lat", "lon", "date"]
            }),
        ),
    ]
}

fn function(name: &'static str, description: &'static str, parameters: Value) -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: ToolFunction {
            name,
            description,
            parameters,
        },
    }
}

/// Runs one tool call. Every failure becomes an `{"error", "message"}`
/// document for the model; nothing here aborts the turn.
pub async fn execute(fetcher: &SceneFetcher, call: &ToolCall, events: &mut Vec<AgentEvent>) -> Value {
    let name = call.function.name.as_str();
    log::info!("Tool call {} {}", name, call.function.arguments);

    let result = match name {
        GEOCODE_LOCATION => match parse::<GeocodeArgs>(&call.function.arguments) {
            Ok(args) => {
                events.push(AgentEvent::Geocoding {
                    query: args.location_query.clone(),
                });
                fetcher
                    .geocode(&args.location_query)
                    .await
                    .map(|location| {
                        json!({
                            "latitude": location.latitude,
                            "longitude": location.longitude,
                            "address": location.address,
                        })
                    })
                    .map_err(|e| failure(&e))
            }
            Err(err) => Err(err),
        },
        DOWNLOAD_SENTINEL1 => download(fetcher, Satellite::Sentinel1, call, events).await,
        DOWNLOAD_SENTINEL2 => download(fetcher, Satellite::Sentinel2, call, events).await,
        other => Err(json!({
            "error": "unknown_tool",
            "message": format!("no tool named '{other}'"),
        })),
    };

    let content = result.unwrap_or_else(|err| err);
    events.push(AgentEvent::ToolResult {
        tool: name.to_string(),
        content: content.clone(),
    });
    content
}

async fn download(
    fetcher: &SceneFetcher,
    satellite: Satellite,
    call: &ToolCall,
    events: &mut Vec<AgentEvent>,
) -> Result<Value, Value> {
    let args: DownloadArgs = parse(&call.function.arguments)?;
    let day_window = args.day_window.unwrap_or(fetcher.defaults().day_window);
    events.push(AgentEvent::Downloading {
        satellite,
        lat: args.lat,
        lon: args.lon,
        date: args.date,
        day_window,
    });

    let request = FetchRequest {
        day_window: Some(day_window),
        cloud_ceiling: match satellite {
            Satellite::Sentinel1 => None,
            Satellite::Sentinel2 => args.cloud_ceiling,
        },
        ..FetchRequest::at(satellite, args.lat, args.lon, args.date)
    };
    fetcher
        .fetch(&request)
        .await
        .map(|report| summarize(&report))
        .map_err(|e| failure(&e))
}

fn parse<T: DeserializeOwned>(arguments: &str) -> Result<T, Value> {
    serde_json::from_str(arguments).map_err(|e| {
        json!({
            "error": "invalid_arguments",
            "message": e.to_string(),
        })
    })
}

fn failure(err: &FetchError) -> Value {
    json!({
        "error": err.code(),
        "message": err.to_string(),
    })
}

/// Compact view of a report for the model: paths and sizes, never file contents.
fn summarize(report: &SceneReport) -> Value {
    let mut saved = Vec::new();
    let mut failed = Vec::new();
    for band in &report.bands {
        match &band.result {
            BandResult::Saved(file) => saved.push(json!({
                "band": band.band,
                "path": file.path.display().to_string(),
                "bytes": file.bytes,
            })),
            BandResult::Failed { error } => failed.push(json!({
                "band": band.band,
                "error": error.to_string(),
            })),
        }
    }
    json!({
        "scene_id": report.scene_id,
        "acquired": report.acquired.to_rfc3339(),
        "day_distance": report.day_distance,
        "cloud_cover": report.cloud_cover,
        "saved": saved,
        "failed": failed,
    })
}
