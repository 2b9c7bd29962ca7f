//! Create `vrf`, `prefix`, `ip_address` and `vlan` tables.
//!
//! Prefixes and IP addresses may sit inside a VRF; a VRF's tenant is their
//! fallback owner when they carry no tenant of their own.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vrf::Table)
                    .if_not_exists()
                    .col(uuid(Vrf::Id).primary_key())
                    .col(string_len(Vrf::Name, 50).not_null())
                    .col(string_len(Vrf::Rd, 21).unique_key().not_null())
                    .col(uuid_null(Vrf::TenantId))
                    .col(timestamp_with_time_zone(Vrf::CreatedAt).not_null())
                    .foreign_key(&mut tenant_fk("fk_vrf_tenant", Vrf::Table, Vrf::TenantId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Prefix::Table)
                    .if_not_exists()
                    .col(uuid(Prefix::Id).primary_key())
                    .col(string_len(Prefix::Prefix, 43).not_null())
                    .col(uuid_null(Prefix::VrfId))
                    .col(uuid_null(Prefix::TenantId))
                    .col(timestamp_with_time_zone(Prefix::CreatedAt).not_null())
                    .foreign_key(&mut vrf_fk("fk_prefix_vrf", Prefix::Table, Prefix::VrfId))
                    .foreign_key(&mut tenant_fk("fk_prefix_tenant", Prefix::Table, Prefix::TenantId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IpAddress::Table)
                    .if_not_exists()
                    .col(uuid(IpAddress::Id).primary_key())
                    .col(string_len(IpAddress::Address, 43).not_null())
                    .col(uuid_null(IpAddress::VrfId))
                    .col(uuid_null(IpAddress::TenantId))
                    .col(timestamp_with_time_zone(IpAddress::CreatedAt).not_null())
                    .foreign_key(&mut vrf_fk("fk_ip_address_vrf", IpAddress::Table, IpAddress::VrfId))
                    .foreign_key(&mut tenant_fk("fk_ip_address_tenant", IpAddress::Table, IpAddress::TenantId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vlan::Table)
                    .if_not_exists()
                    .col(uuid(Vlan::Id).primary_key())
                    .col(small_integer(Vlan::Vid).not_null())
                    .col(string_len(Vlan::Name, 64).not_null())
                    .col(uuid_null(Vlan::TenantId))
                    .col(timestamp_with_time_zone(Vlan::CreatedAt).not_null())
                    .foreign_key(&mut tenant_fk("fk_vlan_tenant", Vlan::Table, Vlan::TenantId))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Vlan::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(IpAddress::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Prefix::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Vrf::Table).to_owned()).await
    }
}

fn tenant_fk<T: IntoIden + 'static, C: IntoIden + 'static>(name: &str, table: T, col: C) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, col)
        .to(Tenant::Table, Tenant::Id)
        .on_delete(ForeignKeyAction::Restrict)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

// Deleting a VRF drops the VRF assignment, not the addressing.
fn vrf_fk<T: IntoIden + 'static, C: IntoIden + 'static>(name: &str, table: T, col: C) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, col)
        .to(Vrf::Table, Vrf::Id)
        .on_delete(ForeignKeyAction::SetNull)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

#[derive(DeriveIden)]
enum Vrf { Table, Id, Name, Rd, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Prefix { Table, Id, Prefix, VrfId, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum IpAddress { Table, Id, Address, VrfId, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Vlan { Table, Id, Vid, Name, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }
