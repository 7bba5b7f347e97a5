use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

/// Fixed taxonomy seeded at startup; effectively immutable afterwards.
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Выпечка и кондитерские изделия",
    "Овощи, фрукты и зелень",
    "Домашние заготовки и консервы",
    "Мёд и продукты пчеловодства",
    "Молочные продукты",
    "Мясо, рыба и продукты из них",
    "Напитки",
    "Семена, саженцы и сопутствующее",
    "Другое съедобное",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Insert-or-ignore seeding; safe to run on every start.
pub async fn seed(db: &PgPool) -> anyhow::Result<()> {
    let mut inserted = 0u64;
    for name in DEFAULT_CATEGORIES {
        let result = sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(db)
            .await?;
        inserted += result.rows_affected();
    }
    if inserted > 0 {
        info!(inserted, "seeded categories");
    }
    Ok(())
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    Ok(find_by_id(db, id).await?.is_some())
}
