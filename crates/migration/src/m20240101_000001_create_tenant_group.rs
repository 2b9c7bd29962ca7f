//! Create `tenant_group` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantGroup::Table)
                    .if_not_exists()
                    .col(uuid(TenantGroup::Id).primary_key())
                    .col(string_len(TenantGroup::Name, 50).unique_key().not_null())
                    .col(string_len(TenantGroup::Slug, 50).unique_key().not_null())
                    .col(timestamp_with_time_zone(TenantGroup::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TenantGroup::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TenantGroup { Table, Id, Name, Slug, CreatedAt }
