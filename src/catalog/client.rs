use reqwest::Client;
use serde_json::{json, Value};

use super::error::CatalogError;
use super::types::{BoundingBox, SceneRecord, SearchWindow};
use crate::config::CatalogConfig;

/// Client for a STAC API `/search` endpoint.
pub struct CatalogClient {
    client: Client,
    search_url: String,
    page_limit: u32,
    max_pages: u32,
}

struct NextLink {
    href: String,
    body: Option<Value>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            search_url: format!("{}/search", config.url.trim_end_matches('/')),
            page_limit: config.page_limit,
            max_pages: config.max_pages.max(1),
        })
    }

    /// Returns every item the catalog reports for the box and window, in service order.
    pub async fn search(
        &self,
        collection_id: &str,
        bbox: &BoundingBox,
        window: &SearchWindow,
    ) -> Result<Vec<SceneRecord>, CatalogError> {
        let body = json!({
            "collections": [collection_id],
            "bbox": bbox.to_stac(),
            "datetime": window.to_stac(),
            "limit": self.page_limit,
        });

        log::info!(
            "Searching {} for {} in {:?}",
            collection_id,
            window.to_stac(),
            bbox.to_stac()
        );

        let mut records = Vec::new();
        let mut next: Option<NextLink> = None;

        for page in 0..self.max_pages {
            let response = match next.take() {
                None => self.client.post(&self.search_url).json(&body).send().await?,
                Some(NextLink {
                    href,
                    body: Some(link_body),
                }) => self.client.post(&href).json(&link_body).send().await?,
                Some(NextLink { href, body: None }) => self.client.get(&href).send().await?,
            };

            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::ServiceUnavailable(format!(
                    "search returned {status}"
                )));
            }

            let page_json: Value = response.json().await?;
            let features = page_json
                .get("features")
                .and_then(|f| f.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default();

            for feature in features {
                match SceneRecord::from_feature(feature) {
                    Some(record) => records.push(record),
                    None => log::warn!(
                        "Skipping undecodable catalog item {}",
                        feature.get("id").and_then(|v| v.as_str()).unwrap_or("<no id>")
                    ),
                }
            }

            next = next_link(&page_json, &body);
            if next.is_none() || features.is_empty() {
                break;
            }
            if page + 1 == self.max_pages {
                log::warn!(
                    "Stopping catalog paging after {} pages ({} items)",
                    self.max_pages,
                    records.len()
                );
            }
        }

        log::info!("Catalog returned {} items", records.len());
        Ok(records)
    }
}

/// Finds the `rel=next` link. A link with `merge: true` carries only the
/// changed parameters, which are overlaid on the original search body.
fn next_link(page: &Value, search: &Value) -> Option<NextLink> {
    page.get("links")?
        .as_array()?
        .iter()
        .find(|link| link.get("rel").and_then(|r| r.as_str()) == Some("next"))
        .and_then(|link| {
            let href = link.get("href")?.as_str()?.to_string();
            let merge = link.get("merge").and_then(Value::as_bool).unwrap_or(false);
            let body = match (link.get("body"), search) {
                (Some(Value::Object(changes)), Value::Object(original)) if merge => {
                    let mut merged = original.clone();
                    merged.extend(changes.clone());
                    Some(Value::Object(merged))
                }
                (body, _) => body.cloned(),
            };
            Some(NextLink { href, body })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, serve_with};
    use axum::{
        routing::{get, post},
        Json, Router,
    };
    use chrono::NaiveDate;
    use std::time::Duration;

    fn config(url: String) -> CatalogConfig {
        CatalogConfig {
            url,
            page_limit: 2,
            max_pages: 4,
            timeout: Duration::from_secs(5),
            ..CatalogConfig::default()
        }
    }

    fn feature(id: &str, day: u32) -> Value {
        json!({
            "id": id,
            "collection": "sentinel-1-grd",
            "properties": { "datetime": format!("2023-06-{day:02}T21:00:00Z") },
            "assets": { "vv": { "href": format!("s3://bucket/{id}/vv.tif") } }
        })
    }

    fn inputs() -> (BoundingBox, SearchWindow) {
        (
            BoundingBox::around(35.18, 129.07, 0.2).unwrap(),
            SearchWindow::around(NaiveDate::from_ymd_opt(2023, 6, 2).unwrap(), 10).unwrap(),
        )
    }

    #[tokio::test]
    async fn follows_next_links_in_order() {
        let base = serve_with(|base| {
            Router::new().route(
                "/search",
                post(move |Json(body): Json<Value>| async move {
                    if body.get("token").is_some() {
                        Json(json!({ "features": [feature("c", 9)], "links": [] }))
                    } else {
                        assert_eq!(body["collections"][0], "sentinel-1-grd");
                        assert_eq!(body["limit"], 2);
                        Json(json!({
                            "features": [
                                feature("a", 1),
                                { "id": "undated", "properties": {} },
                                feature("b", 5)
                            ],
                            "links": [{
                                "rel": "next",
                                "href": format!("{base}/search"),
                                "body": { "token": "p2" }
                            }]
                        }))
                    }
                }),
            )
        })
        .await;

        let client = CatalogClient::new(&config(base)).unwrap();
        let (bbox, window) = inputs();
        let records = client.search("sentinel-1-grd", &bbox, &window).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn merges_partial_next_body_into_search() {
        let base = serve_with(|base| {
            Router::new().route(
                "/search",
                post(move |Json(body): Json<Value>| async move {
                    assert_eq!(body["collections"][0], "sentinel-1-grd");
                    assert!(body["bbox"].is_array());
                    match body["page"].as_u64() {
                        Some(2) => Json(json!({ "features": [feature("second", 4)], "links": [] })),
                        _ => Json(json!({
                            "features": [feature("first", 2)],
                            "links": [{
                                "rel": "next",
                                "href": format!("{base}/search"),
                                "method": "POST",
                                "body": { "page": 2 },
                                "merge": true
                            }]
                        })),
                    }
                }),
            )
        })
        .await;

        let client = CatalogClient::new(&config(base)).unwrap();
        let (bbox, window) = inputs();
        let records = client.search("sentinel-1-grd", &bbox, &window).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[test]
    fn next_body_replaces_search_without_merge() {
        let search = json!({ "collections": ["c"], "limit": 2 });
        let page = json!({ "links": [
            { "rel": "self", "href": "http://x/self" },
            { "rel": "next", "href": "http://x/search", "body": { "token": "t" } }
        ]});
        let link = next_link(&page, &search).unwrap();
        assert_eq!(link.href, "http://x/search");
        assert_eq!(link.body, Some(json!({ "token": "t" })));

        let page = json!({ "links": [{ "rel": "next", "href": "http://x/items?page=2" }] });
        assert_eq!(next_link(&page, &search).unwrap().body, None);
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let base = serve_with(|base| {
            let next = json!([{ "rel": "next", "href": format!("{base}/search") }]);
            let first_next = next.clone();
            Router::new().route(
                "/search",
                get(move || async move {
                    Json(json!({ "features": [feature("again", 3)], "links": next }))
                })
                .post(move || async move {
                    Json(json!({ "features": [feature("first", 2)], "links": first_next }))
                }),
            )
        })
        .await;

        let mut cfg = config(base);
        cfg.max_pages = 3;
        let client = CatalogClient::new(&cfg).unwrap();
        let (bbox, window) = inputs();
        let records = client.search("sentinel-1-grd", &bbox, &window).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["first", "again", "again"]);
    }

    #[tokio::test]
    async fn empty_result_is_not_an_error() {
        let router = Router::new().route(
            "/search",
            post(|| async { Json(json!({ "type": "FeatureCollection", "features": [] })) }),
        );
        let base = serve(router).await;
        let client = CatalogClient::new(&config(base)).unwrap();
        let (bbox, window) = inputs();
        let records = client.search("sentinel-1-grd", &bbox, &window).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_service_unavailable() {
        let router = Router::new().route(
            "/search",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "down") }),
        );
        let base = serve(router).await;
        let client = CatalogClient::new(&config(base)).unwrap();
        let (bbox, window) = inputs();
        let err = client
            .search("sentinel-1-grd", &bbox, &window)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ServiceUnavailable(_)));
    }
}
