use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    ads::{self, dto::AdView},
    categories::repo::{self, Category},
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:id/ads", get(ads_in_category))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    let categories = repo::list(&state.db).await.map_err(internal)?;
    Ok(Json(categories))
}

#[derive(Debug, Serialize)]
pub struct CategoryAdsResponse {
    pub category: Category,
    pub ads: Vec<AdView>,
}

#[instrument(skip(state))]
pub async fn ads_in_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryAdsResponse>, (StatusCode, String)> {
    let category = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Category not found".to_string()))?;

    let rows = ads::repo::list_by_category(&state.db, id)
        .await
        .map_err(internal)?;
    let ads = rows
        .into_iter()
        .map(|row| AdView::from_row(row, None, state.images.as_ref()))
        .collect();

    Ok(Json(CategoryAdsResponse { category, ads }))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
