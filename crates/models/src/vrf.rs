use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, ip_address, prefix, tenant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vrf")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Route distinguisher, e.g. `65000:100`.
    pub rd: String,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Tenant, Prefix, IpAddress }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Tenant => Entity::belongs_to(tenant::Entity)
                .from(Column::TenantId)
                .to(tenant::Column::Id)
                .into(),
            Relation::Prefix => Entity::has_many(prefix::Entity).into(),
            Relation::IpAddress => Entity::has_many(ip_address::Entity).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_rd(rd: &str) -> Result<(), ModelError> {
    let ok = rd.len() <= 21
        && matches!(rd.split_once(':'), Some((a, b)) if !a.is_empty() && !b.is_empty() && b.chars().all(|c| c.is_ascii_digit()));
    if !ok {
        return Err(ModelError::Validation("route distinguisher must look like ASN:NN or IP:NN".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, name: &str, rd: &str, tenant_id: Option<Uuid>) -> Result<Model, ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    validate_rd(rd)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        rd: Set(rd.to_string()),
        tenant_id: Set(tenant_id),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::validate_rd;

    #[test]
    fn rd_format() {
        assert!(validate_rd("65000:100").is_ok());
        assert!(validate_rd("10.0.0.1:7").is_ok());
        assert!(validate_rd("65000").is_err());
        assert!(validate_rd("65000:x").is_err());
    }
}
