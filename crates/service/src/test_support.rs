#![cfg(test)]
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, in_memory_config};
use models::tenant::TenantFields;

/// Fresh, migrated in-memory database private to the calling test.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = connect_with_config(&in_memory_config()).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn tenant_fields(name: &str, slug: &str) -> TenantFields {
    TenantFields { name: name.into(), slug: slug.into(), ..Default::default() }
}
