//! Pure core of the listing query engine: radius normalization, the
//! great-circle proximity filter, and in-memory pagination.

use crate::ads::repo::AdWithSeller;
use crate::geo::{haversine_km, Coordinates};

pub const PAGE_SIZE: usize = 12;
pub const DEFAULT_RADIUS_KM: u32 = 400;
pub const ALLOWED_RADII_KM: [u32; 6] = [100, 200, 300, 400, 500, 1000];

/// Any radius outside the fixed allowed set silently falls back to the
/// default.
pub fn normalize_radius(requested: Option<u32>) -> u32 {
    match requested {
        Some(r) if ALLOWED_RADII_KM.contains(&r) => r,
        _ => DEFAULT_RADIUS_KM,
    }
}

/// A price must be a real non-negative number. NaN slips past a plain
/// `< 0.0` check (and past the database CHECK, where `NaN >= 0` holds).
pub fn price_is_valid(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

/// Keeps ads whose seller is located within `radius_km` of `center`, paired
/// with the unrounded distance. Sellers without coordinates are dropped, not
/// carried as "unknown distance". Inclusion is `<=`, on the raw value.
pub fn filter_by_distance(
    rows: Vec<AdWithSeller>,
    center: Coordinates,
    radius_km: f64,
) -> Vec<(AdWithSeller, f64)> {
    rows.into_iter()
        .filter_map(|row| {
            let (lat, lon) = match (row.seller_latitude, row.seller_longitude) {
                (Some(lat), Some(lon)) => (lat, lon),
                _ => return None,
            };
            let d = haversine_km(center.latitude, center.longitude, lat, lon);
            (d <= radius_km).then_some((row, d))
        })
        .collect()
}

/// Slices one 1-based page out of an already-filtered, already-ordered
/// sequence. Filtering happens before this slice, so a page is full whenever
/// more matching items exist.
pub fn page_slice<T>(items: Vec<T>, page: usize) -> (Vec<T>, bool) {
    let start = page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE);
    let has_more = items.len().saturating_sub(start) > PAGE_SIZE;
    let page_items = items.into_iter().skip(start).take(PAGE_SIZE).collect();
    (page_items, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn ad_at(coords: Option<(f64, f64)>) -> AdWithSeller {
        AdWithSeller {
            id: Uuid::new_v4(),
            title: "Мёд липовый".into(),
            description: "Свежий урожай".into(),
            price: 500.0,
            image: None,
            created_at: OffsetDateTime::now_utc(),
            category_id: Uuid::new_v4(),
            category_name: "Мёд и продукты пчеловодства".into(),
            user_id: Uuid::new_v4(),
            seller_name: "Иван".into(),
            seller_phone: "+7".into(),
            seller_city: "Оренбург".into(),
            seller_latitude: coords.map(|c| c.0),
            seller_longitude: coords.map(|c| c.1),
        }
    }

    const ORENBURG: Coordinates = Coordinates {
        latitude: 51.7727,
        longitude: 55.0988,
    };

    #[test]
    fn radius_outside_allowed_set_falls_back_to_default() {
        assert_eq!(normalize_radius(Some(750)), 400);
        assert_eq!(normalize_radius(Some(0)), 400);
        assert_eq!(normalize_radius(None), 400);
    }

    #[test]
    fn allowed_radii_pass_through() {
        for r in ALLOWED_RADII_KM {
            assert_eq!(normalize_radius(Some(r)), r);
        }
    }

    #[test]
    fn seller_without_coordinates_is_dropped() {
        let kept = filter_by_distance(vec![ad_at(None)], ORENBURG, 1000.0);
        assert!(kept.is_empty());
    }

    #[test]
    fn distance_exactly_at_radius_is_included() {
        let seller = (53.1959, 50.1002); // Samara
        let exact = haversine_km(
            ORENBURG.latitude,
            ORENBURG.longitude,
            seller.0,
            seller.1,
        );
        let kept = filter_by_distance(vec![ad_at(Some(seller))], ORENBURG, exact);
        assert_eq!(kept.len(), 1);
        // the unrounded distance rides along for the display annotation
        assert!((kept[0].1 - exact).abs() < 1e-9);
    }

    #[test]
    fn distance_just_past_radius_is_excluded() {
        let seller = (53.1959, 50.1002);
        let exact = haversine_km(
            ORENBURG.latitude,
            ORENBURG.longitude,
            seller.0,
            seller.1,
        );
        let kept = filter_by_distance(vec![ad_at(Some(seller))], ORENBURG, exact - 1e-6);
        assert!(kept.is_empty());
    }

    #[test]
    fn comparison_uses_unrounded_distance() {
        // ~0.7 km away: rounds to 1, but a 0.5 km radius must still exclude it
        let nearby = (ORENBURG.latitude + 0.0063, ORENBURG.longitude);
        let d = haversine_km(
            ORENBURG.latitude,
            ORENBURG.longitude,
            nearby.0,
            nearby.1,
        );
        assert!(d > 0.5 && d < 1.0);
        assert!(filter_by_distance(vec![ad_at(Some(nearby))], ORENBURG, 0.5).is_empty());
        assert_eq!(
            filter_by_distance(vec![ad_at(Some(nearby))], ORENBURG, 1.0).len(),
            1
        );
    }

    #[test]
    fn page_slice_reports_has_more() {
        let items: Vec<u32> = (0..30).collect();
        let (page1, more) = page_slice(items.clone(), 1);
        assert_eq!(page1, (0..12).collect::<Vec<_>>());
        assert!(more);

        let (page3, more) = page_slice(items, 3);
        assert_eq!(page3, (24..30).collect::<Vec<_>>());
        assert!(!more);
    }

    #[test]
    fn page_beyond_end_is_empty() {
        let (page, more) = page_slice(vec![1, 2, 3], 5);
        assert!(page.is_empty());
        assert!(!more);
    }

    #[test]
    fn page_zero_is_treated_as_first() {
        let (page, _) = page_slice((0..5).collect::<Vec<_>>(), 0);
        assert_eq!(page, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn absurd_page_number_does_not_overflow() {
        let (page, more) = page_slice((0..5).collect::<Vec<_>>(), usize::MAX);
        assert!(page.is_empty());
        assert!(!more);
    }

    #[test]
    fn price_rejects_nan_and_infinities() {
        assert!(!price_is_valid(f64::NAN));
        assert!(!price_is_valid(f64::INFINITY));
        assert!(!price_is_valid(f64::NEG_INFINITY));
        assert!(!price_is_valid(-0.01));
    }

    #[test]
    fn price_accepts_ordinary_values() {
        assert!(price_is_valid(0.0));
        assert!(price_is_valid(499.99));
    }

    // Pins the redesign of the inherited page-then-filter order: the distance
    // filter runs over the whole candidate set first, so pages stay full
    // whenever more in-radius ads exist.
    #[test]
    fn nearby_pages_fill_before_slicing() {
        let mut rows = Vec::new();
        for i in 0..30 {
            // alternate: even rows in radius, odd rows far away
            let coords = if i % 2 == 0 {
                (ORENBURG.latitude + 0.01, ORENBURG.longitude)
            } else {
                (55.7558, 37.6173) // Moscow, ~1230 km out
            };
            rows.push(ad_at(Some(coords)));
        }
        let filtered = filter_by_distance(rows, ORENBURG, 100.0);
        assert_eq!(filtered.len(), 15);
        let (page1, has_more) = page_slice(filtered, 1);
        assert_eq!(page1.len(), PAGE_SIZE);
        assert!(has_more);
    }
}
