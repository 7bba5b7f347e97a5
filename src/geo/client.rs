use std::num::ParseFloatError;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Resolves a free-text city name to coordinates.
///
/// Absence is a normal outcome: every failure mode (network, timeout, no
/// match, malformed response) collapses to `None` at this boundary.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, city: &str) -> Option<Coordinates>;
}

#[derive(Debug, Error)]
enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no match for query")]
    NoMatch,
    #[error("unparsable coordinate: {0}")]
    BadCoordinate(#[from] ParseFloatError),
}

/// First element of the Nominatim search response; lat/lon come as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn into_coordinates(self) -> Result<Coordinates, GeocodeError> {
        Ok(Coordinates {
            latitude: self.lat.parse::<f64>()?,
            longitude: self.lon.parse::<f64>()?,
        })
    }
}

pub struct NominatimGeocoder {
    http: reqwest::Client,
    endpoint: String,
    region_hint: String,
}

impl NominatimGeocoder {
    pub fn new(cfg: &GeocoderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(GEOCODE_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            region_hint: cfg.region_hint.clone(),
        })
    }

    async fn lookup(&self, city: &str) -> Result<Coordinates, GeocodeError> {
        // Регион добавляем, чтобы не уехать в одноимённый город в другой стране
        let query = format!("{}, {}", city, self.region_hint);
        let places: Vec<Place> = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        places
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoMatch)?
            .into_coordinates()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, city: &str) -> Option<Coordinates> {
        match self.lookup(city).await {
            Ok(coords) => {
                debug!(%city, lat = coords.latitude, lon = coords.longitude, "city resolved");
                Some(coords)
            }
            Err(e) => {
                warn!(%city, error = %e, "geocoding failed, treating as unresolved");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_place_from_nominatim_payload() {
        let body = r#"[{"place_id":1,"lat":"51.7727","lon":"55.0988","display_name":"Оренбург"}]"#;
        let places: Vec<Place> = serde_json::from_str(body).unwrap();
        let coords = places.into_iter().next().unwrap().into_coordinates().unwrap();
        assert!((coords.latitude - 51.7727).abs() < 1e-9);
        assert!((coords.longitude - 55.0988).abs() < 1e-9);
    }

    #[test]
    fn empty_result_set_has_no_place() {
        let places: Vec<Place> = serde_json::from_str("[]").unwrap();
        assert!(places.into_iter().next().is_none());
    }

    #[test]
    fn unparsable_coordinate_is_an_error() {
        let place = Place {
            lat: "not-a-number".into(),
            lon: "55.0988".into(),
        };
        assert!(place.into_coordinates().is_err());
    }

    #[test]
    fn malformed_payload_fails_to_deserialize() {
        let body = r#"{"lat":"51.7","lon":"55.1"}"#; // object, not array
        assert!(serde_json::from_str::<Vec<Place>>(body).is_err());
    }
}
