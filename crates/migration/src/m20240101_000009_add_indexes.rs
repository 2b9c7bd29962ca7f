use sea_orm_migration::prelude::*;

const TENANT_INDEXES: &[(&str, &str)] = &[
    ("idx_site_tenant", "site"),
    ("idx_rack_tenant", "rack"),
    ("idx_device_tenant", "device"),
    ("idx_vrf_tenant", "vrf"),
    ("idx_prefix_tenant", "prefix"),
    ("idx_ip_address_tenant", "ip_address"),
    ("idx_vlan_tenant", "vlan"),
    ("idx_circuit_tenant", "circuit"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Tenant: index on group_id for list filtering and group counts
        manager
            .create_index(
                Index::create()
                    .name("idx_tenant_group")
                    .table(Tenant::Table)
                    .col(Tenant::GroupId)
                    .to_owned(),
            )
            .await?;

        // Detail page counters filter every inventory table by tenant_id
        for (name, table) in TENANT_INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(Alias::new(*table))
                        .col(Alias::new("tenant_id"))
                        .to_owned(),
                )
                .await?;
        }

        // VRF inheritance lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_prefix_vrf")
                    .table(Prefix::Table)
                    .col(Prefix::VrfId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_ip_address_vrf")
                    .table(IpAddress::Table)
                    .col(IpAddress::VrfId)
                    .to_owned(),
            )
            .await?;

        // UserPermission: one row per (user, codename)
        manager
            .create_index(
                Index::create()
                    .name("uniq_user_permission_codename")
                    .table(UserPermission::Table)
                    .col(UserPermission::UserId)
                    .col(UserPermission::Codename)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_user_permission_codename").table(UserPermission::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ip_address_vrf").table(IpAddress::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_prefix_vrf").table(Prefix::Table).to_owned())
            .await?;
        for (name, table) in TENANT_INDEXES.iter().rev() {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        manager
            .drop_index(Index::drop().name("idx_tenant_group").table(Tenant::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenant { Table, GroupId }

#[derive(DeriveIden)]
enum Prefix { Table, VrfId }

#[derive(DeriveIden)]
enum IpAddress { Table, VrfId }

#[derive(DeriveIden)]
enum UserPermission { Table, UserId, Codename }
