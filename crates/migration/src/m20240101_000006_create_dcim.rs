//! Create `site`, `rack` and `device` tables.
//!
//! Each row may belong to a tenant; a tenant owning rows cannot be deleted.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Site::Table)
                    .if_not_exists()
                    .col(uuid(Site::Id).primary_key())
                    .col(string_len(Site::Name, 50).unique_key().not_null())
                    .col(string_len(Site::Slug, 50).unique_key().not_null())
                    .col(uuid_null(Site::TenantId))
                    .col(timestamp_with_time_zone(Site::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_site_tenant")
                            .from(Site::Table, Site::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rack::Table)
                    .if_not_exists()
                    .col(uuid(Rack::Id).primary_key())
                    .col(string_len(Rack::Name, 50).not_null())
                    .col(uuid(Rack::SiteId).not_null())
                    .col(uuid_null(Rack::TenantId))
                    .col(timestamp_with_time_zone(Rack::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rack_site")
                            .from(Rack::Table, Rack::SiteId)
                            .to(Site::Table, Site::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rack_tenant")
                            .from(Rack::Table, Rack::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Device::Table)
                    .if_not_exists()
                    .col(uuid(Device::Id).primary_key())
                    .col(string_len_null(Device::Name, 50))
                    .col(uuid(Device::SiteId).not_null())
                    .col(uuid_null(Device::TenantId))
                    .col(timestamp_with_time_zone(Device::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_site")
                            .from(Device::Table, Device::SiteId)
                            .to(Site::Table, Site::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_tenant")
                            .from(Device::Table, Device::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Device::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Rack::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Site::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Site { Table, Id, Name, Slug, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Rack { Table, Id, Name, SiteId, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Device { Table, Id, Name, SiteId, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }
