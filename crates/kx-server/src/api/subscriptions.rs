//! Store subscription endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use kx_db::entities::{plan, store, subscription};
use kx_db::AppState;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{bad_request, db_error, not_found, ApiError, ListResponse};

const BILLING_CYCLES: &[&str] = &["monthly", "yearly"];
const SUBSCRIPTION_STATUSES: &[&str] = &["active", "cancelled", "expired"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub billing_cycle: String,
    pub status: String,
    pub created_at: String,
}

impl From<subscription::Model> for SubscriptionResponse {
    fn from(s: subscription::Model) -> Self {
        Self {
            id: s.id,
            store_id: s.store_id,
            plan_id: s.plan_id,
            billing_cycle: s.billing_cycle,
            status: s.status,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub store_id: Uuid,
    pub plan_id: Uuid,
    #[serde(default = "default_cycle")]
    pub billing_cycle: String,
}

fn default_cycle() -> String {
    "monthly".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub plan_id: Option<Uuid>,
    pub billing_cycle: Option<String>,
    pub status: Option<String>,
}

/// GET /api/v1/subscriptions
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse<SubscriptionResponse>>, ApiError> {
    let subscriptions = subscription::Entity::find()
        .order_by_desc(subscription::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(
        subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
    )))
}

/// POST /api/v1/subscriptions
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    if !BILLING_CYCLES.contains(&body.billing_cycle.as_str()) {
        return Err(bad_request(format!(
            "Invalid billing cycle '{}'",
            body.billing_cycle
        )));
    }

    let store_exists = store::Entity::find_by_id(body.store_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .is_some();
    if !store_exists {
        return Err(bad_request("Store does not exist"));
    }

    let plan_exists = plan::Entity::find_by_id(body.plan_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .is_some();
    if !plan_exists {
        return Err(bad_request("Plan does not exist"));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(body.store_id),
        plan_id: Set(body.plan_id),
        billing_cycle: Set(body.billing_cycle),
        status: Set("active".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    tracing::info!(
        subscription_id = %model.id,
        store_id = %model.store_id,
        "subscription created"
    );
    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(model))))
}

/// PUT /api/v1/subscriptions/{id}
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let existing = subscription::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Subscription"))?;

    if let Some(cycle) = body.billing_cycle.as_deref() {
        if !BILLING_CYCLES.contains(&cycle) {
            return Err(bad_request(format!("Invalid billing cycle '{cycle}'")));
        }
    }
    if let Some(status) = body.status.as_deref() {
        if !SUBSCRIPTION_STATUSES.contains(&status) {
            return Err(bad_request(format!("Invalid subscription status '{status}'")));
        }
    }
    if let Some(plan_id) = body.plan_id {
        let plan_exists = plan::Entity::find_by_id(plan_id)
            .one(&state.db)
            .await
            .map_err(db_error)?
            .is_some();
        if !plan_exists {
            return Err(bad_request("Plan does not exist"));
        }
    }

    let mut active: subscription::ActiveModel = existing.into();
    if let Some(plan_id) = body.plan_id {
        active.plan_id = Set(plan_id);
    }
    if let Some(cycle) = body.billing_cycle {
        active.billing_cycle = Set(cycle);
    }
    if let Some(status) = body.status {
        active.status = Set(status);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    let model = active.update(&state.db).await.map_err(db_error)?;
    Ok(Json(SubscriptionResponse::from(model)))
}

/// DELETE /api/v1/subscriptions/{id}
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = subscription::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Subscription"))?;

    subscription::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    tracing::info!(subscription_id = %id, "subscription deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_to_monthly() {
        let req: CreateSubscriptionRequest = serde_json::from_str(
            r#"{"storeId":"7f3b2c84-97f3-4ab5-a378-308a07330b1a",
                "planId":"aa51cf9e-6f3c-4f3e-91f3-1f2f9a3b4c5d"}"#,
        )
        .unwrap();
        assert_eq!(req.billing_cycle, "monthly");
    }

    #[test]
    fn billing_cycles_are_closed_set() {
        assert!(BILLING_CYCLES.contains(&"monthly"));
        assert!(BILLING_CYCLES.contains(&"yearly"));
        assert!(!BILLING_CYCLES.contains(&"weekly"));
    }
}
