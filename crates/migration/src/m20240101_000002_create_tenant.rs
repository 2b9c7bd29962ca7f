//! Create `tenant` table with nullable FK to `tenant_group`.
//!
//! Removing a group leaves its tenants ungrouped.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenant::Table)
                    .if_not_exists()
                    .col(uuid(Tenant::Id).primary_key())
                    .col(string_len(Tenant::Name, 30).unique_key().not_null())
                    .col(string_len(Tenant::Slug, 50).unique_key().not_null())
                    .col(uuid_null(Tenant::GroupId))
                    .col(string_len(Tenant::Description, 100).not_null().default(""))
                    .col(text(Tenant::Comments).not_null().default(""))
                    .col(timestamp_with_time_zone(Tenant::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Tenant::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenant_group")
                            .from(Tenant::Table, Tenant::GroupId)
                            .to(TenantGroup::Table, TenantGroup::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Tenant::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Tenant { Table, Id, Name, Slug, GroupId, Description, Comments, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum TenantGroup { Table, Id }
