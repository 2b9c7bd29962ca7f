use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Circuit::Table)
                    .if_not_exists()
                    .col(uuid(Circuit::Id).primary_key())
                    .col(string_len(Circuit::Cid, 50).unique_key().not_null())
                    .col(uuid_null(Circuit::TenantId))
                    .col(timestamp_with_time_zone(Circuit::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_circuit_tenant")
                            .from(Circuit::Table, Circuit::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Circuit::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Circuit { Table, Id, Cid, TenantId, CreatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }
