use axum::{
    extract::{Path as UrlPath, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::Config;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    serve_with(|_| router).await
}

/// Like [`serve`], but the router can refer to its own base URL.
pub async fn serve_with(build: impl FnOnce(String) -> Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let router = build(base.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    base
}

/// Geocoder, STAC search and asset host in one local server.
///
/// - `/nominatim/search` knows only "Busan".
/// - `/stac/search` has two Sentinel-1 scenes (the 2023-06-03 one lacks `vh`)
///   and two Sentinel-2 scenes: 2023-05-25 at 5 % cloud, 2023-06-03 at 50 %.
/// - `/assets/{name}` echoes the name as the file body.
pub async fn fake_upstream() -> String {
    serve_with(|base| {
        Router::new()
            .route("/nominatim/search", get(fake_geocode))
            .route(
                "/stac/search",
                post(move |Json(body): Json<Value>| async move { fake_search(&base, &body) }),
            )
            .route("/assets/{name}", get(fake_asset))
    })
    .await
}

pub fn test_config(base: &str, destination: &Path) -> Config {
    let mut config = Config::default();
    config.storage.destination_dir = destination.to_path_buf();
    config.catalog.url = format!("{base}/stac");
    config.catalog.timeout = Duration::from_secs(5);
    config.geocoder.url = format!("{base}/nominatim");
    config.geocoder.min_interval = Duration::from_millis(10);
    config.geocoder.timeout = Duration::from_secs(5);
    config.download.timeout = Duration::from_secs(5);
    config
}

async fn fake_geocode(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("q").map(String::as_str) {
        Some("Busan") => Json(json!([{
            "lat": "35.1796",
            "lon": "129.0750",
            "display_name": "Busan, South Korea"
        }])),
        _ => Json(json!([])),
    }
}

fn fake_search(base: &str, body: &Value) -> Json<Value> {
    let asset = |name: &str| json!({ "href": format!("{base}/assets/{name}"), "type": "image/tiff" });
    let features = match body["collections"][0].as_str() {
        Some("sentinel-1-grd") => json!([
            {
                "id": "S1_20230525",
                "collection": "sentinel-1-grd",
                "properties": { "datetime": "2023-05-25T21:30:00Z" },
                "assets": { "vv": asset("s1a-vv.tif"), "vh": asset("s1a-vh.tif") }
            },
            {
                "id": "S1_20230603",
                "collection": "sentinel-1-grd",
                "properties": { "datetime": "2023-06-03T09:30:00Z" },
                "assets": { "vv": asset("s1b-vv.tif") }
            }
        ]),
        Some("sentinel-2-l2a") => {
            let assets = json!({
                "visual": asset("tci.tif"),
                "red": asset("b04.tif"),
                "green": asset("b03.tif"),
                "blue": asset("b02.tif")
            });
            json!([
                {
                    "id": "S2_20230525",
                    "collection": "sentinel-2-l2a",
                    "properties": { "datetime": "2023-05-25T02:15:00Z", "eo:cloud_cover": 5.0 },
                    "assets": assets
                },
                {
                    "id": "S2_20230603",
                    "collection": "sentinel-2-l2a",
                    "properties": { "datetime": "2023-06-03T02:15:00Z", "eo:cloud_cover": 50.0 },
                    "assets": assets
                }
            ])
        }
        _ => json!([]),
    };
    Json(json!({ "type": "FeatureCollection", "features": features, "links": [] }))
}

async fn fake_asset(UrlPath(name): UrlPath<String>) -> impl IntoResponse {
    if name.starts_with("missing") {
        (StatusCode::NOT_FOUND, Vec::new())
    } else {
        (StatusCode::OK, name.into_bytes())
    }
}
