mod client;
mod error;
mod types;

pub use client::CatalogClient;
pub use error::CatalogError;
#[cfg(test)]
pub use types::Asset;
pub use types::{BoundingBox, CollectionRef, ImageryKind, Satellite, SceneRecord, SearchWindow};
