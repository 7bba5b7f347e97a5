use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ads::repo::AdWithSeller;
use crate::storage::ImageStore;

/// Listing query parameters. Numeric fields deserialize leniently: an
/// unparsable `lat`, `radius` or `page` is treated as absent rather than
/// failing the whole request (the radius then falls back to the default).
#[derive(Debug, Deserialize)]
pub struct ListAdsQuery {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub lon: Option<f64>,
    pub near_city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub radius: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<usize>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<T>().ok()))
}

#[derive(Debug, Serialize)]
pub struct SellerView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub city: String,
}

/// An ad as rendered to clients. `distance_km` is the transient proximity
/// annotation: rounded for display, never persisted.
#[derive(Debug, Serialize)]
pub struct AdView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub category: String,
    pub seller: SellerView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<i64>,
}

impl AdView {
    pub fn from_row(
        row: AdWithSeller,
        distance_km: Option<f64>,
        images: &dyn ImageStore,
    ) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            image_url: row.image.as_deref().map(|f| images.public_url(f)),
            created_at: row.created_at,
            category_id: row.category_id,
            category: row.category_name,
            seller: SellerView {
                id: row.user_id,
                name: row.seller_name,
                phone: row.seller_phone,
                city: row.seller_city,
            },
            // rounding happens here and only here
            distance_km: distance_km.map(|d| d.round() as i64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdListResponse {
    pub items: Vec<AdView>,
    pub page: usize,
    pub has_more: bool,
    pub nearby_mode: bool,
    pub none_nearby: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdDetailResponse {
    #[serde(flatten)]
    pub ad: AdView,
    pub is_favorite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Query-string values always arrive as strings, so JSON string fields
    // exercise the same path.
    fn parse(json: &str) -> ListAdsQuery {
        serde_json::from_str(json).expect("query should deserialize")
    }

    #[test]
    fn numeric_params_parse_from_strings() {
        let q = parse(r#"{"lat":"51.77","lon":"55.09","radius":"200","page":"2"}"#);
        assert_eq!(q.lat, Some(51.77));
        assert_eq!(q.lon, Some(55.09));
        assert_eq!(q.radius, Some(200));
        assert_eq!(q.page, Some(2));
    }

    #[test]
    fn garbage_numeric_params_are_absent_not_an_error() {
        let q = parse(r#"{"lat":"abc","lon":"","radius":"wide","page":"-1"}"#);
        assert_eq!(q.lat, None);
        assert_eq!(q.lon, None);
        assert_eq!(q.radius, None);
        assert_eq!(q.page, None);
    }

    #[test]
    fn missing_params_default_to_absent() {
        let q = parse("{}");
        assert!(q.q.is_none() && q.lat.is_none() && q.radius.is_none() && q.page.is_none());
    }
}
