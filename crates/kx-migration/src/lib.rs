pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_users;
mod m20250901_000002_create_plans;
mod m20250901_000003_create_themes;
mod m20250901_000004_create_stores;
mod m20250901_000005_create_subscriptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_users::Migration),
            Box::new(m20250901_000002_create_plans::Migration),
            Box::new(m20250901_000003_create_themes::Migration),
            Box::new(m20250901_000004_create_stores::Migration),
            Box::new(m20250901_000005_create_subscriptions::Migration),
        ]
    }
}
