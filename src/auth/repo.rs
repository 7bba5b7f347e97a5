use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::geo::Coordinates;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub phone: &'a str,
    pub city: &'a str,
    pub coords: Option<Coordinates>,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, phone, city, latitude, longitude, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password and optional geocoded position.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, phone, city, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.phone)
        .bind(new.city)
        .bind(new.coords.map(|c| c.latitude))
        .bind(new.coords.map(|c| c.longitude))
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Overwrite profile fields. Coordinates are replaced together with the
    /// city, including being cleared when geocoding came up empty.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: &str,
        phone: &str,
        city: &str,
        coords: Option<Coordinates>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, phone = $3, city = $4, latitude = $5, longitude = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(city)
        .bind(coords.map(|c| c.latitude))
        .bind(coords.map(|c| c.longitude))
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
