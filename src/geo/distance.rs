const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
///
/// Callers round only when displaying; radius comparisons use the raw value.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let d = haversine_km(51.7727, 55.0988, 51.7727, 55.0988);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = haversine_km(51.7727, 55.0988, 53.1959, 50.1002);
        let b = haversine_km(53.1959, 50.1002, 51.7727, 55.0988);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn moscow_to_petersburg_is_about_634_km() {
        let d = haversine_km(55.7558, 37.6173, 59.9343, 30.3351);
        assert!(d > 625.0 && d < 645.0, "got {d}");
    }

    #[test]
    fn orenburg_to_samara_is_about_370_km() {
        let d = haversine_km(51.7727, 55.0988, 53.1959, 50.1002);
        assert!(d > 355.0 && d < 395.0, "got {d}");
    }
}
