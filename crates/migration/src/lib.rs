//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_tenant_group;
mod m20240101_000002_create_tenant;
mod m20240101_000003_create_user;
mod m20240101_000004_create_user_credentials;
mod m20240101_000005_create_user_permission;
mod m20240101_000006_create_dcim;
mod m20240101_000007_create_ipam;
mod m20240101_000008_create_circuit;
mod m20240101_000009_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_tenant_group::Migration),
            Box::new(m20240101_000002_create_tenant::Migration),
            Box::new(m20240101_000003_create_user::Migration),
            Box::new(m20240101_000004_create_user_credentials::Migration),
            Box::new(m20240101_000005_create_user_permission::Migration),
            Box::new(m20240101_000006_create_dcim::Migration),
            Box::new(m20240101_000007_create_ipam::Migration),
            Box::new(m20240101_000008_create_circuit::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000009_add_indexes::Migration),
        ]
    }
}
