//! Subscription plan endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use kx_db::entities::{plan, subscription};
use kx_db::AppState;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{bad_request, conflict, db_error, not_found, ApiError, ListResponse};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    /// Computed: what yearly billing saves against twelve monthly cycles.
    pub yearly_savings: i64,
    pub active: bool,
    pub created_at: String,
}

impl From<plan::Model> for PlanResponse {
    fn from(p: plan::Model) -> Self {
        let yearly_savings = p.yearly_savings();
        Self {
            id: p.id,
            name: p.name,
            price_monthly: p.price_monthly,
            price_yearly: p.price_yearly,
            yearly_savings,
            active: p.active,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub price_monthly: Option<i64>,
    pub price_yearly: Option<i64>,
    pub active: Option<bool>,
}

/// GET /api/v1/plans
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse<PlanResponse>>, ApiError> {
    let plans = plan::Entity::find()
        .order_by_asc(plan::Column::PriceMonthly)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(
        plans.into_iter().map(PlanResponse::from).collect(),
    )))
}

/// POST /api/v1/plans
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanResponse>), ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(bad_request("Plan name is required"));
    }
    if body.price_monthly < 0 || body.price_yearly < 0 {
        return Err(bad_request("Plan prices must be non-negative"));
    }

    let existing = plan::Entity::find()
        .filter(plan::Column::Name.eq(&name))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing.is_some() {
        return Err(conflict(format!("A plan named '{name}' already exists")));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = plan::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        price_monthly: Set(body.price_monthly),
        price_yearly: Set(body.price_yearly),
        active: Set(body.active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    tracing::info!(plan_id = %model.id, name = %model.name, "plan created");
    Ok((StatusCode::CREATED, Json(PlanResponse::from(model))))
}

/// PUT /api/v1/plans/{id}
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let existing = plan::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Plan"))?;

    if body.price_monthly.is_some_and(|p| p < 0) || body.price_yearly.is_some_and(|p| p < 0) {
        return Err(bad_request("Plan prices must be non-negative"));
    }

    let mut active: plan::ActiveModel = existing.into();
    if let Some(name) = body.name {
        if !name.trim().is_empty() {
            active.name = Set(name.trim().to_string());
        }
    }
    if let Some(price) = body.price_monthly {
        active.price_monthly = Set(price);
    }
    if let Some(price) = body.price_yearly {
        active.price_yearly = Set(price);
    }
    if let Some(flag) = body.active {
        active.active = Set(flag);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let model = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(PlanResponse::from(model)))
}

/// DELETE /api/v1/plans/{id} — refused while subscriptions reference it.
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = plan::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Plan"))?;

    let referenced = subscription::Entity::find()
        .filter(subscription::Column::PlanId.eq(existing.id))
        .count(&state.db)
        .await
        .map_err(db_error)?;
    if referenced > 0 {
        return Err(conflict(format!(
            "Cannot delete plan. {referenced} subscription(s) still reference it."
        )));
    }

    plan::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    tracing::info!(plan_id = %id, "plan deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn response_carries_computed_savings() {
        let model = plan::Model {
            id: Uuid::new_v4(),
            name: "Growth".into(),
            price_monthly: 500,
            price_yearly: 4800,
            active: true,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        };
        let json = serde_json::to_value(PlanResponse::from(model)).unwrap();
        assert_eq!(json["priceMonthly"], 500);
        assert_eq!(json["priceYearly"], 4800);
        assert_eq!(json["yearlySavings"], 1200);
    }

    #[test]
    fn create_request_defaults_active() {
        let req: CreatePlanRequest =
            serde_json::from_str(r#"{"name":"Basic","priceMonthly":0,"priceYearly":0}"#).unwrap();
        assert!(req.active);
    }
}
