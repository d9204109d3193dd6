//! Store management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use kx_build::{is_valid_slug, slugify};
use kx_db::entities::{store, user};
use kx_db::AppState;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{bad_request, conflict, db_error, not_found, ApiError, ListResponse};

const STORE_STATUSES: &[&str] = &["active", "suspended"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_id: Uuid,
    pub theme_id: Option<Uuid>,
    pub status: String,
    pub created_at: String,
}

impl From<store::Model> for StoreResponse {
    fn from(s: store::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            slug: s.slug,
            owner_id: s.owner_id,
            theme_id: s.theme_id,
            status: s.status,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub slug: Option<String>,
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub status: Option<String>,
    pub theme_id: Option<Uuid>,
}

async fn find_store(state: &AppState, slug: &str) -> Result<store::Model, ApiError> {
    store::Entity::find()
        .filter(store::Column::Slug.eq(slug))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Store"))
}

/// GET /api/v1/stores
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreListQuery>,
) -> Result<Json<ListResponse<StoreResponse>>, ApiError> {
    let mut stores = store::Entity::find()
        .order_by_desc(store::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    if let Some(search) = query.search.as_deref() {
        if !search.is_empty() {
            let needle = search.to_lowercase();
            stores.retain(|s| {
                s.name.to_lowercase().contains(&needle) || s.slug.to_lowercase().contains(&needle)
            });
        }
    }

    Ok(Json(ListResponse::new(
        stores.into_iter().map(StoreResponse::from).collect(),
    )))
}

/// GET /api/v1/stores/{slug}
pub async fn get_store(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<StoreResponse>, ApiError> {
    let model = find_store(&state, &slug).await?;
    Ok(Json(StoreResponse::from(model)))
}

/// POST /api/v1/stores
pub async fn create_store(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(bad_request("Store name is required"));
    }

    let slug = body.slug.unwrap_or_else(|| slugify(&name));
    if !is_valid_slug(&slug) {
        return Err(bad_request(format!("Invalid slug '{slug}'")));
    }

    let owner = user::Entity::find_by_id(body.owner_id)
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if owner.is_none() {
        return Err(bad_request("Owner user does not exist"));
    }

    let existing = store::Entity::find()
        .filter(store::Column::Slug.eq(&slug))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing.is_some() {
        return Err(conflict(format!("A store with slug '{slug}' already exists")));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = store::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug),
        owner_id: Set(body.owner_id),
        theme_id: Set(None),
        status: Set("active".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    tracing::info!(slug = %model.slug, store_id = %model.id, "store created");
    Ok((StatusCode::CREATED, Json(StoreResponse::from(model))))
}

/// PUT /api/v1/stores/{slug}
pub async fn update_store(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(body): Json<UpdateStoreRequest>,
) -> Result<Json<StoreResponse>, ApiError> {
    let existing = find_store(&state, &slug).await?;

    if let Some(status) = body.status.as_deref() {
        if !STORE_STATUSES.contains(&status) {
            return Err(bad_request(format!("Invalid store status '{status}'")));
        }
    }

    let mut active: store::ActiveModel = existing.into();
    if let Some(name) = body.name {
        if !name.trim().is_empty() {
            active.name = Set(name.trim().to_string());
        }
    }
    if let Some(status) = body.status {
        active.status = Set(status);
    }
    if let Some(theme_id) = body.theme_id {
        active.theme_id = Set(Some(theme_id));
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let model = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(StoreResponse::from(model)))
}

/// DELETE /api/v1/stores/{slug} — irreversible; subscriptions go with it.
pub async fn delete_store(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = find_store(&state, &slug).await?;

    store::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    tracing::info!(slug = %slug, "store deleted");
    Ok(StatusCode::NO_CONTENT)
}
