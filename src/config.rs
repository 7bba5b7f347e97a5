use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub region_hint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub upload_dir: String,
    pub geocoder: GeocoderConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "foodboard".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "foodboard-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let geocoder = GeocoderConfig {
            endpoint: std::env::var("GEOCODER_ENDPOINT")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".into()),
            user_agent: std::env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "foodboard/1.0".into()),
            region_hint: std::env::var("GEOCODER_REGION_HINT")
                .unwrap_or_else(|_| "Оренбургская область, Россия".into()),
        };
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
        Ok(Self {
            database_url,
            jwt,
            upload_dir,
            geocoder,
        })
    }
}
