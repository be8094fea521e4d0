//! Transaction amount scale migration.
//!
//! Drops the fixed scale on transaction amounts so each one is read back
//! with the precision it was priced at (`5.1500`, `0.00200000`).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(UNPIN_SCALE_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(PIN_SCALE_SQL).await?;
        Ok(())
    }
}

const UNPIN_SCALE_SQL: &str = r"
ALTER TABLE transactions
    ALTER COLUMN quantity TYPE NUMERIC,
    ALTER COLUMN price TYPE NUMERIC,
    ALTER COLUMN total_amount TYPE NUMERIC,
    ALTER COLUMN fees TYPE NUMERIC;
";

const PIN_SCALE_SQL: &str = r"
ALTER TABLE transactions
    ALTER COLUMN quantity TYPE NUMERIC(38, 18),
    ALTER COLUMN price TYPE NUMERIC(38, 18),
    ALTER COLUMN total_amount TYPE NUMERIC(38, 18),
    ALTER COLUMN fees TYPE NUMERIC(38, 18);
";
