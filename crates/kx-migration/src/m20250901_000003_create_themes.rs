use sea_orm_migration::prelude::*;

/// Themes table for the uploadable site-skin registry.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ── themes table ────────────────────────────────────────────────
        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS themes (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                slug VARCHAR(64) NOT NULL UNIQUE,
                description TEXT,
                thumbnail_url VARCHAR(500),
                zip_url VARCHAR(500),
                status VARCHAR(20) NOT NULL DEFAULT 'building',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .await?;

        // ── indexes ─────────────────────────────────────────────────────
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_themes_status
             ON themes(status)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS themes").await?;
        Ok(())
    }
}
