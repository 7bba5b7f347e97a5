use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::ads::repo::AdWithSeller;

/// Result of one favorite toggle. Not an "ensure favorited": calling twice
/// returns to the original state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
    Rejected,
}

/// Pure toggle decision; self-favoriting is refused before touching the
/// relation.
pub fn decide(owner_id: Uuid, actor_id: Uuid, currently_favorited: bool) -> ToggleOutcome {
    if owner_id == actor_id {
        ToggleOutcome::Rejected
    } else if currently_favorited {
        ToggleOutcome::Removed
    } else {
        ToggleOutcome::Added
    }
}

pub async fn contains(db: &PgPool, user_id: Uuid, ad_id: Uuid) -> anyhow::Result<bool> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT 1 FROM favorites WHERE user_id = $1 AND ad_id = $2")
            .bind(user_id)
            .bind(ad_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

pub async fn add(db: &PgPool, user_id: Uuid, ad_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO favorites (user_id, ad_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(ad_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn remove(db: &PgPool, user_id: Uuid, ad_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND ad_id = $2")
        .bind(user_id)
        .bind(ad_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<AdWithSeller>> {
    let rows = sqlx::query_as::<_, AdWithSeller>(
        "SELECT a.id, a.title, a.description, a.price, a.image, \
         a.created_at, a.category_id, c.name AS category_name, a.user_id, \
         u.name AS seller_name, u.phone AS seller_phone, u.city AS seller_city, \
         u.latitude AS seller_latitude, u.longitude AS seller_longitude \
         FROM favorites f \
         JOIN ads a ON a.id = f.ad_id \
         JOIN users u ON u.id = a.user_id \
         JOIN categories c ON c.id = a.category_id \
         WHERE f.user_id = $1 \
         ORDER BY a.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_ad_is_rejected_regardless_of_membership() {
        let me = Uuid::new_v4();
        assert_eq!(decide(me, me, false), ToggleOutcome::Rejected);
        assert_eq!(decide(me, me, true), ToggleOutcome::Rejected);
    }

    #[test]
    fn toggling_twice_restores_original_state() {
        let owner = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let first = decide(owner, actor, false);
        assert_eq!(first, ToggleOutcome::Added);
        let second = decide(owner, actor, true);
        assert_eq!(second, ToggleOutcome::Removed);
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ToggleOutcome::Added).unwrap(),
            "\"added\""
        );
        assert_eq!(
            serde_json::to_string(&ToggleOutcome::Rejected).unwrap(),
            "\"rejected\""
        );
    }
}
