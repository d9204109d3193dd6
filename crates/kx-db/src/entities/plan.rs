use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription plan. Prices are in minor units (paise); the yearly
/// savings figure is computed, never stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub price_monthly: i64,
    pub price_yearly: i64,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// What a customer saves per year by paying yearly instead of monthly.
    pub fn yearly_savings(&self) -> i64 {
        self.price_monthly * 12 - self.price_yearly
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscription,
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscription.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_yearly_savings() {
        let plan = Model {
            id: Uuid::new_v4(),
            name: "Growth".into(),
            price_monthly: 500,
            price_yearly: 4800,
            active: true,
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        };
        assert_eq!(plan.yearly_savings(), 1200);
    }
}
