use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ad {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub user_id: Uuid,
}

/// An ad joined with its seller's contact/location and category name.
/// Seller coordinates drive the proximity filter; they are both present or
/// both absent (written together from one geocoding call).
#[derive(Debug, Clone, FromRow)]
pub struct AdWithSeller {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub category_id: Uuid,
    pub category_name: String,
    pub user_id: Uuid,
    pub seller_name: String,
    pub seller_phone: String,
    pub seller_city: String,
    pub seller_latitude: Option<f64>,
    pub seller_longitude: Option<f64>,
}

pub struct NewAd<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub price: f64,
    pub image: Option<&'a str>,
    pub category_id: Uuid,
    pub user_id: Uuid,
}

const JOINED_SELECT: &str = "SELECT a.id, a.title, a.description, a.price, a.image, \
     a.created_at, a.category_id, c.name AS category_name, a.user_id, \
     u.name AS seller_name, u.phone AS seller_phone, u.city AS seller_city, \
     u.latitude AS seller_latitude, u.longitude AS seller_longitude \
     FROM ads a \
     JOIN users u ON u.id = a.user_id \
     JOIN categories c ON c.id = a.category_id";

/// Escape LIKE metacharacters so a search word matches literally.
pub(crate) fn escape_like(word: &str) -> String {
    word.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Builds the listing query: every search word must appear (case-insensitive)
/// in the title or the description; newest ads first. `page` is
/// `(limit, offset)` and is omitted when the caller paginates in memory.
fn build_search(words: &[String], page: Option<(i64, i64)>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(JOINED_SELECT);
    for (i, word) in words.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        let pattern = format!("%{}%", escape_like(word));
        qb.push("(a.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR a.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    qb.push(" ORDER BY a.created_at DESC");
    if let Some((limit, offset)) = page {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
    }
    qb
}

pub async fn search(
    db: &PgPool,
    words: &[String],
    page: Option<(i64, i64)>,
) -> anyhow::Result<Vec<AdWithSeller>> {
    let rows = build_search(words, page)
        .build_query_as::<AdWithSeller>()
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<AdWithSeller>> {
    let row = sqlx::query_as::<_, AdWithSeller>(&format!("{JOINED_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn list_by_category(db: &PgPool, category_id: Uuid) -> anyhow::Result<Vec<AdWithSeller>> {
    let rows = sqlx::query_as::<_, AdWithSeller>(&format!(
        "{JOINED_SELECT} WHERE a.category_id = $1 ORDER BY a.created_at DESC"
    ))
    .bind(category_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<AdWithSeller>> {
    let rows = sqlx::query_as::<_, AdWithSeller>(&format!(
        "{JOINED_SELECT} WHERE a.user_id = $1 ORDER BY a.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(db: &PgPool, new: NewAd<'_>) -> anyhow::Result<Ad> {
    let ad = sqlx::query_as::<_, Ad>(
        r#"
        INSERT INTO ads (title, description, price, image, category_id, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, description, price, image, created_at, category_id, user_id
        "#,
    )
    .bind(new.title)
    .bind(new.description)
    .bind(new.price)
    .bind(new.image)
    .bind(new.category_id)
    .bind(new.user_id)
    .fetch_one(db)
    .await?;
    Ok(ad)
}

/// Full-field replace, as the edit form submits every field. A `None` image
/// keeps the existing one.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: &str,
    description: &str,
    price: f64,
    category_id: Uuid,
    image: Option<&str>,
) -> anyhow::Result<Ad> {
    let ad = sqlx::query_as::<_, Ad>(
        r#"
        UPDATE ads
        SET title = $2, description = $3, price = $4, category_id = $5,
            image = COALESCE($6, image)
        WHERE id = $1
        RETURNING id, title, description, price, image, created_at, category_id, user_id
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(price)
    .bind(category_id)
    .bind(image)
    .fetch_one(db)
    .await?;
    Ok(ad)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM ads WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Owner lookup used for edit/delete/favorite authorization checks.
pub async fn owner_of(db: &PgPool, id: Uuid) -> anyhow::Result<Option<(Uuid, Option<String>)>> {
    let row = sqlx::query_as::<_, (Uuid, Option<String>)>(
        "SELECT user_id, image FROM ads WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_metacharacters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c\\d"), "c\\\\d");
        assert_eq!(escape_like("мёд"), "мёд");
    }

    #[test]
    fn search_with_no_words_has_no_where_clause() {
        let sql = build_search(&[], None).sql().to_string();
        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("ORDER BY a.created_at DESC"));
    }

    #[test]
    fn each_word_adds_a_conjunctive_title_or_description_clause() {
        let words = vec!["мёд".to_string(), "липовый".to_string()];
        let sql = build_search(&words, None).sql().to_string();
        assert_eq!(sql.matches("a.title ILIKE").count(), 2);
        assert_eq!(sql.matches("a.description ILIKE").count(), 2);
        assert_eq!(sql.matches(" AND ").count(), 1);
        assert_eq!(sql.matches(" OR ").count(), 2);
    }

    #[test]
    fn paged_search_appends_limit_and_offset() {
        let sql = build_search(&[], Some((13, 12))).sql().to_string();
        assert!(sql.contains("LIMIT"));
        assert!(sql.contains("OFFSET"));
    }
}
