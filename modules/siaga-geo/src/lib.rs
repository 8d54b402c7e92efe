pub mod cover;
pub mod geocode;

pub use cover::{encode_cell, query_bounds, GeohashRange};
pub use geocode::{Geocoder, HereGeocoder, Place, Suggestion};
