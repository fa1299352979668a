use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Why a single band could not be saved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, ToSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BandFailure {
    #[error("band not available for this scene")]
    AssetMissing,
    #[error("transfer failed: {0}")]
    TransferFailed(String),
    #[error("destination not writable: {0}")]
    DestinationUnwritable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SavedBand {
    #[schema(value_type = String)]
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BandResult {
    Saved(SavedBand),
    Failed { error: BandFailure },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BandOutcome {
    pub band: String,
    #[serde(flatten)]
    pub result: BandResult,
}

impl BandOutcome {
    pub fn saved(&self) -> Option<&SavedBand> {
        match &self.result {
            BandResult::Saved(saved) => Some(saved),
            BandResult::Failed { .. } => None,
        }
    }

    #[cfg(test)]
    pub fn failure(&self) -> Option<&BandFailure> {
        match &self.result {
            BandResult::Saved(_) => None,
            BandResult::Failed { error } => Some(error),
        }
    }
}

/// Per-band results for one scene, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DownloadOutcome {
    pub bands: Vec<BandOutcome>,
}

#[cfg(test)]
impl DownloadOutcome {
    pub fn saved_count(&self) -> usize {
        self.bands.iter().filter(|b| b.saved().is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.saved_count() == self.bands.len()
    }
}
