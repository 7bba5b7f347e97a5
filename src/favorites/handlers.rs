use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    ads::{self, dto::AdView},
    auth::AuthUser,
    favorites::repo::{self, ToggleOutcome},
    state::AppState,
};

pub fn toggle_router() -> Router<AppState> {
    Router::new().route("/ads/:id/favorite", post(toggle_favorite))
}

pub fn me_router() -> Router<AppState> {
    Router::new().route("/me/favorites", get(my_favorites))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub outcome: ToggleOutcome,
}

#[instrument(skip(state))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(ad_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, (StatusCode, String)> {
    let (owner_id, _) = ads::repo::owner_of(&state.db, ad_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Ad not found".to_string()))?;

    let currently = repo::contains(&state.db, user_id, ad_id)
        .await
        .map_err(internal)?;

    let outcome = repo::decide(owner_id, user_id, currently);
    match outcome {
        ToggleOutcome::Added => repo::add(&state.db, user_id, ad_id).await.map_err(internal)?,
        ToggleOutcome::Removed => repo::remove(&state.db, user_id, ad_id)
            .await
            .map_err(internal)?,
        ToggleOutcome::Rejected => {}
    }

    info!(%ad_id, %user_id, ?outcome, "favorite toggled");
    Ok(Json(ToggleResponse { outcome }))
}

#[instrument(skip(state))]
pub async fn my_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AdView>>, (StatusCode, String)> {
    let rows = repo::list_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    let views = rows
        .into_iter()
        .map(|row| AdView::from_row(row, None, state.images.as_ref()))
        .collect();
    Ok(Json(views))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
