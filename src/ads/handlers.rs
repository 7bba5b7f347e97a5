use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    ads::{
        dto::{AdDetailResponse, AdListResponse, AdView, ListAdsQuery},
        repo::{self, NewAd},
        services::{filter_by_distance, normalize_radius, page_slice, price_is_valid, PAGE_SIZE},
    },
    auth::{AuthUser, OptionalAuthUser},
    categories,
    favorites,
    geo::Coordinates,
    images,
    state::AppState,
};

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/ads", get(list_ads))
        .route("/ads/:id", get(get_ad))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/ads", post(create_ad))
        .route("/ads/:id", put(update_ad))
        .route("/ads/:id", delete(delete_ad))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

pub fn me_router() -> Router<AppState> {
    Router::new().route("/me/ads", get(my_ads))
}

/// GET /ads — the listing query engine.
///
/// Free-text search, optional proximity filter around explicit coordinates or
/// a geocoded city, fixed page size of 12. Distance filtering runs before the
/// page slice, so a page is short only when the matches genuinely run out.
#[instrument(skip(state))]
pub async fn list_ads(
    State(state): State<AppState>,
    Query(p): Query<ListAdsQuery>,
) -> Result<Json<AdListResponse>, (StatusCode, String)> {
    let words: Vec<String> = p
        .q
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let (center, city_unresolved) =
        resolve_center(state.geocoder.as_ref(), p.lat, p.lon, p.near_city.as_deref()).await;
    let notice = if city_unresolved {
        // Город не нашёлся — показываем всё, но сообщаем об этом
        p.near_city
            .as_deref()
            .map(|city| format!("Город \"{}\" не найден — показываем все", city))
    } else {
        None
    };

    let nearby_mode = center.is_some();
    let page = p.page.unwrap_or(1).max(1);

    let (items, has_more, none_nearby) = if let Some(center) = center {
        let radius = normalize_radius(p.radius) as f64;
        let candidates = repo::search(&state.db, &words, None)
            .await
            .map_err(internal)?;
        let filtered = filter_by_distance(candidates, center, radius);
        let none_nearby = filtered.is_empty();
        let (page_items, has_more) = page_slice(filtered, page);
        let views = page_items
            .into_iter()
            .map(|(row, d)| AdView::from_row(row, Some(d), state.images.as_ref()))
            .collect();
        (views, has_more, none_nearby)
    } else {
        let offset = i64::try_from(page.saturating_sub(1).saturating_mul(PAGE_SIZE))
            .unwrap_or(i64::MAX);
        // fetch one extra row to learn whether another page exists
        let mut rows = repo::search(&state.db, &words, Some((PAGE_SIZE as i64 + 1, offset)))
            .await
            .map_err(internal)?;
        let has_more = rows.len() > PAGE_SIZE;
        rows.truncate(PAGE_SIZE);
        let views = rows
            .into_iter()
            .map(|row| AdView::from_row(row, None, state.images.as_ref()))
            .collect();
        // An unresolvable city still signals "nothing nearby" while the
        // listing degrades to showing everything
        (views, has_more, city_unresolved)
    };

    Ok(Json(AdListResponse {
        items,
        page,
        has_more,
        nearby_mode,
        none_nearby,
        notice,
    }))
}

/// Picks the proximity center. A requested city takes precedence over
/// explicit coordinates, and a city that fails to geocode discards them
/// too; the second flag reports that unresolved-city fallback.
async fn resolve_center(
    geocoder: &dyn crate::geo::Geocoder,
    lat: Option<f64>,
    lon: Option<f64>,
    near_city: Option<&str>,
) -> (Option<Coordinates>, bool) {
    match near_city {
        Some(city) => {
            let resolved = geocoder.resolve(city).await;
            let unresolved = resolved.is_none();
            (resolved, unresolved)
        }
        None => match (lat, lon) {
            (Some(latitude), Some(longitude)) => (
                Some(Coordinates {
                    latitude,
                    longitude,
                }),
                false,
            ),
            _ => (None, false),
        },
    }
}

#[instrument(skip(state))]
pub async fn get_ad(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdDetailResponse>, (StatusCode, String)> {
    let row = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Ad not found".to_string()))?;

    let is_favorite = match viewer {
        Some(user_id) => favorites::repo::contains(&state.db, user_id, id)
            .await
            .map_err(internal)?,
        None => false,
    };

    Ok(Json(AdDetailResponse {
        ad: AdView::from_row(row, None, state.images.as_ref()),
        is_favorite,
    }))
}

#[instrument(skip(state))]
pub async fn my_ads(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AdView>>, (StatusCode, String)> {
    let rows = repo::list_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    let views = rows
        .into_iter()
        .map(|row| AdView::from_row(row, None, state.images.as_ref()))
        .collect();
    Ok(Json(views))
}

#[derive(Default)]
struct AdForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    category_id: Option<Uuid>,
    image: Option<(String, Bytes)>,
}

async fn read_ad_form(mp: &mut Multipart) -> Result<AdForm, (StatusCode, String)> {
    let mut form = AdForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(bad_request)?),
            "description" => form.description = Some(field.text().await.map_err(bad_request)?),
            "price" => {
                let text = field.text().await.map_err(bad_request)?;
                let price = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid price".to_string()))?;
                form.price = Some(price);
            }
            "category_id" => {
                let text = field.text().await.map_err(bad_request)?;
                let id = text
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid category id".to_string()))?;
                form.category_id = Some(id);
            }
            "image" => {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(bad_request)?;
                if let Some(filename) = filename {
                    if !filename.is_empty() && !data.is_empty() {
                        form.image = Some((filename, data));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn require<T>(value: Option<T>, what: &str) -> Result<T, (StatusCode, String)> {
    value.ok_or((StatusCode::BAD_REQUEST, format!("{} is required", what)))
}

#[instrument(skip(state, mp))]
pub async fn create_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<AdView>), (StatusCode, String)> {
    let form = read_ad_form(&mut mp).await?;

    let title = require(form.title, "title")?;
    let description = require(form.description, "description")?;
    let price = require(form.price, "price")?;
    let category_id = require(form.category_id, "category_id")?;

    if !price_is_valid(price) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Price must be a non-negative number".into(),
        ));
    }
    if !categories::repo::exists(&state.db, category_id)
        .await
        .map_err(internal)?
    {
        return Err((StatusCode::NOT_FOUND, "Category not found".into()));
    }

    // A rejected extension is the same as no image at all
    let image = match form.image {
        Some((filename, data)) => images::services::store_upload(&state, &filename, data)
            .await
            .map_err(internal)?,
        None => None,
    };

    let ad = repo::create(
        &state.db,
        NewAd {
            title: &title,
            description: &description,
            price,
            image: image.as_deref(),
            category_id,
            user_id,
        },
    )
    .await
    .map_err(internal)?;

    let row = repo::find_by_id(&state.db, ad.id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Ad vanished".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/ads/{}", ad.id)
            .parse()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "bad location".to_string()))?,
    );

    info!(ad_id = %ad.id, user_id = %user_id, "ad created");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AdView::from_row(row, None, state.images.as_ref())),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<AdView>, (StatusCode, String)> {
    let (owner, old_image) = repo::owner_of(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Ad not found".to_string()))?;
    if owner != user_id {
        warn!(ad_id = %id, user_id = %user_id, "edit refused, not the owner");
        return Err((StatusCode::FORBIDDEN, "Not your ad".into()));
    }

    let form = read_ad_form(&mut mp).await?;
    let title = require(form.title, "title")?;
    let description = require(form.description, "description")?;
    let price = require(form.price, "price")?;
    let category_id = require(form.category_id, "category_id")?;

    if !price_is_valid(price) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Price must be a non-negative number".into(),
        ));
    }
    if !categories::repo::exists(&state.db, category_id)
        .await
        .map_err(internal)?
    {
        return Err((StatusCode::NOT_FOUND, "Category not found".into()));
    }

    let image = match form.image {
        Some((filename, data)) => images::services::store_upload(&state, &filename, data)
            .await
            .map_err(internal)?,
        None => None,
    };

    repo::update(
        &state.db,
        id,
        &title,
        &description,
        price,
        category_id,
        image.as_deref(),
    )
    .await
    .map_err(internal)?;

    // A replaced image leaves its file behind otherwise
    if let Some(old) = images::services::superseded_image(old_image, image.as_deref()) {
        if let Err(e) = state.images.delete(&old).await {
            warn!(error = %e, filename = %old, "could not remove replaced ad image");
        }
    }

    let row = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Ad vanished".to_string()))?;

    info!(ad_id = %id, user_id = %user_id, "ad updated");
    Ok(Json(AdView::from_row(row, None, state.images.as_ref())))
}

#[instrument(skip(state))]
pub async fn delete_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let (owner, image) = repo::owner_of(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Ad not found".to_string()))?;
    if owner != user_id {
        warn!(ad_id = %id, user_id = %user_id, "delete refused, not the owner");
        return Err((StatusCode::FORBIDDEN, "Not your ad".into()));
    }

    repo::delete(&state.db, id).await.map_err(internal)?;

    if let Some(filename) = image {
        if let Err(e) = state.images.delete(&filename).await {
            warn!(error = %e, %filename, "could not remove ad image");
        }
    }

    info!(ad_id = %id, user_id = %user_id, "ad deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}
