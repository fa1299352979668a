mod error;
mod nominatim;

pub use error::GeocodeError;
pub use nominatim::{Geocoder, Location};
