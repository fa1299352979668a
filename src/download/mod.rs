mod downloader;
mod types;

pub use downloader::Downloader;
pub use types::{BandFailure, BandOutcome, BandResult, SavedBand};
