pub mod client;
pub mod distance;

pub use client::{Coordinates, Geocoder, NominatimGeocoder};
pub use distance::haversine_km;
