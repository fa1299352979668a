mod error;
mod fetcher;
mod report;

pub use error::FetchError;
pub use fetcher::{FetchRequest, SceneFetcher};
pub use report::SceneReport;
