use reqwest::{Client, StatusCode};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::types::{BandFailure, BandOutcome, BandResult, DownloadOutcome, SavedBand};
use crate::catalog::SceneRecord;
use crate::config::DownloadConfig;

pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(config: &DownloadConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client })
    }

    /// Saves each requested band of `record` as `{scene_id}_{band}.tif` in `dest_dir`.
    ///
    /// Bands are independent: a missing asset or failed transfer is recorded
    /// for that band and the remaining ones are still fetched.
    pub async fn fetch_bands(
        &self,
        record: &SceneRecord,
        bands: &[String],
        dest_dir: &Path,
    ) -> DownloadOutcome {
        if let Err(e) = fs::create_dir_all(dest_dir) {
            log::error!("Cannot create {}: {}", dest_dir.display(), e);
            let failure = BandFailure::DestinationUnwritable(e.to_string());
            return DownloadOutcome {
                bands: bands
                    .iter()
                    .map(|band| failed(band, failure.clone()))
                    .collect(),
            };
        }

        let mut outcome = DownloadOutcome::default();
        for band in bands {
            let band_outcome = match record.asset(band) {
                None => {
                    log::warn!("Scene {} has no '{}' asset", record.id, band);
                    failed(band, BandFailure::AssetMissing)
                }
                Some((key, asset)) => {
                    let url = s3_to_http(&asset.href);
                    let path = dest_dir.join(band_file_name(&record.id, key));
                    log::info!("Downloading {} band of {} from {}", key, record.id, url);
                    match self.transfer(&url, dest_dir, &path).await {
                        Ok(bytes) => {
                            log::info!("{} bytes saved to {}", bytes, path.display());
                            BandOutcome {
                                band: band.clone(),
                                result: BandResult::Saved(SavedBand { path, bytes }),
                            }
                        }
                        Err(failure) => {
                            log::warn!("Band {} of {} failed: {}", key, record.id, failure);
                            failed(band, failure)
                        }
                    }
                }
            };
            outcome.bands.push(band_outcome);
        }
        outcome
    }

    async fn transfer(&self, url: &str, dir: &Path, path: &Path) -> Result<u64, BandFailure> {
        // stays invisible under its temp name until complete; dropped (and removed) on any error
        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| BandFailure::DestinationUnwritable(e.to_string()))?;

        let mut response = self.client.get(url).send().await.map_err(transfer_failed)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(BandFailure::TransferFailed(format!("HTTP status {status}")));
        }

        let mut len: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(transfer_failed)? {
            len += chunk.len() as u64;
            file.write_all(&chunk).map_err(transfer_failed)?;
        }
        file.flush().map_err(transfer_failed)?;

        file.persist(path)
            .map_err(|e| BandFailure::TransferFailed(e.error.to_string()))?;
        Ok(len)
    }
}

/// Rewrites `s3://bucket/key` to the bucket's public HTTPS endpoint.
pub fn s3_to_http(href: &str) -> String {
    match href.strip_prefix("s3://").and_then(|rest| rest.split_once('/')) {
        Some((bucket, key)) => format!("https://{bucket}.s3.amazonaws.com/{key}"),
        None => href.to_string(),
    }
}

fn band_file_name(scene_id: &str, band: &str) -> String {
    let safe = |s: &str| s.replace(['/', '\\'], "_");
    format!("{}_{}.tif", safe(scene_id), safe(band))
}

fn failed(band: &str, error: BandFailure) -> BandOutcome {
    BandOutcome {
        band: band.to_string(),
        result: BandResult::Failed { error },
    }
}

fn transfer_failed(err: impl std::fmt::Display) -> BandFailure {
    BandFailure::TransferFailed(err.to_string())
}
