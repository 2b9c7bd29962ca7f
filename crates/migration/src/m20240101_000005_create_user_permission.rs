//! Create `user_permission` table: one row per granted permission codename.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserPermission::Table)
                    .if_not_exists()
                    .col(uuid(UserPermission::Id).primary_key())
                    .col(uuid(UserPermission::UserId).not_null())
                    .col(string_len(UserPermission::Codename, 100).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_permission_user")
                            .from(UserPermission::Table, UserPermission::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UserPermission::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UserPermission { Table, Id, UserId, Codename }

#[derive(DeriveIden)]
enum User { Table, Id }
