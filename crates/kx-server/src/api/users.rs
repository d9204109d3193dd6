//! Platform user endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use kx_db::entities::{store, user};
use kx_db::AppState;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{bad_request, conflict, db_error, not_found, ApiError, ListResponse};

const USER_STATUSES: &[&str] = &["active", "suspended"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: user::UserRole,
    pub status: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            status: u.status,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub role: user::UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<user::UserRole>,
    pub status: Option<String>,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse<UserResponse>>, ApiError> {
    let users = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(bad_request("A valid email address is required"));
    }
    if body.name.trim().is_empty() {
        return Err(bad_request("Name is required"));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing.is_some() {
        return Err(conflict(format!("A user with email '{email}' already exists")));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(body.name.trim().to_string()),
        role: Set(body.role),
        status: Set("active".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    tracing::info!(user_id = %model.id, role = %model.role, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(model))))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User"))?;

    if let Some(status) = body.status.as_deref() {
        if !USER_STATUSES.contains(&status) {
            return Err(bad_request(format!("Invalid user status '{status}'")));
        }
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = body.name {
        if !name.trim().is_empty() {
            active.name = Set(name.trim().to_string());
        }
    }
    if let Some(role) = body.role {
        active.role = Set(role);
    }
    if let Some(status) = body.status {
        active.status = Set(status);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let model = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(UserResponse::from(model)))
}

/// DELETE /api/v1/users/{id} — refused while the user still owns stores.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User"))?;

    let owned = store::Entity::find()
        .filter(store::Column::OwnerId.eq(existing.id))
        .count(&state.db)
        .await
        .map_err(db_error)?;
    if owned > 0 {
        return Err(conflict(format!(
            "Cannot delete user. They still own {owned} store(s)."
        )));
    }

    user::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_snake_case() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"email":"a@b.com","name":"Asha","role":"store_manager"}"#,
        )
        .unwrap();
        assert_eq!(req.role, user::UserRole::StoreManager);
        let json = serde_json::to_value(&req.role).unwrap();
        assert_eq!(json, "store_manager");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res: Result<CreateUserRequest, _> =
            serde_json::from_str(r#"{"email":"a@b.com","name":"Asha","role":"wizard"}"#);
        assert!(res.is_err());
    }
}
